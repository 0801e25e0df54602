//! Parley Interactivity - Wait for and collect gateway events.
//!
//! This crate provides:
//! - [`EventWaiter<T>`]: wait for the first `T` matching a predicate, or
//!   collect every match within a time window
//! - [`ReactionCollector`]: a running per-emoji tally of reactions on a
//!   message
//! - [`Interactivity`]: a facade that shares one waiter per event type
//!
//! # Outcomes
//!
//! Timeouts are not errors. A wait that times out, is cancelled, or whose
//! event source shuts down resolves to `None` (or to what was collected so
//! far). Only caller mistakes, such as a zero timeout or using a disposed
//! waiter, are reported as [`InteractivityError`], and they are reported
//! synchronously when the request is made.
//!
//! # Lifecycle
//!
//! Every request is registered through a guard ([`PendingMatch`],
//! [`PendingCollect`], [`PendingReactions`]). The request is live from the
//! moment the guard exists and is removed when the guard is dropped, on
//! every exit path.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod config;
mod error;
mod extension;
mod reaction;
mod request;
mod waiter;

pub use config::{DEFAULT_TIMEOUT, InteractivityConfig};
pub use error::{InteractivityError, InteractivityResult};
pub use extension::Interactivity;
pub use reaction::{PendingReactions, Reaction, ReactionCollector};
pub use request::{Predicate, RequestId, RequestState};
pub use waiter::{EventWaiter, MatchCanceller, PendingCollect, PendingMatch};
