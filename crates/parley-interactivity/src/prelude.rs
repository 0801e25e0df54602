//! Prelude module - commonly used types for convenient import.
//!
//! Use `use parley_interactivity::prelude::*;` to import all essential types.

// Facade
pub use crate::{Interactivity, InteractivityConfig};

// Waiters and collectors
pub use crate::{EventWaiter, MatchCanceller, PendingCollect, PendingMatch};
pub use crate::{PendingReactions, Reaction, ReactionCollector};

// Requests
pub use crate::{RequestId, RequestState};

// Errors
pub use crate::{InteractivityError, InteractivityResult};
