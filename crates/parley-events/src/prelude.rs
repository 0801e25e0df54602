//! Prelude module - commonly used types for convenient import.
//!
//! Use `use parley_events::prelude::*;` to import all essential types.

// Event bus
pub use crate::{EventBus, EventSource};

// Subscriptions
pub use crate::{Handler, SubscriberRegistry, SubscriptionId};

// Errors
pub use crate::{BusError, BusResult};
