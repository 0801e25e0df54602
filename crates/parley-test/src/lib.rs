//! Parley Test - Shared test utilities for the Parley chat SDK.
//!
//! This crate provides event fixtures, a controllable event source and
//! logging helpers that can be used across parley crates as a
//! dev-dependency.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! parley-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use parley_test::{reaction_added, thumbs_up, TEST_MESSAGE};
//!
//! bus.publish(reaction_added(TEST_MESSAGE, 1, thumbs_up()));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod harness;
pub mod mocks;

pub use fixtures::*;
pub use harness::*;
pub use mocks::*;
