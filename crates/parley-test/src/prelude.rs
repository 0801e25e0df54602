//! Prelude module - commonly used test helpers.
//!
//! Use `use parley_test::prelude::*;` in test modules.

pub use crate::fixtures::*;
pub use crate::harness::{setup_test_logging, setup_test_logging_default, test_config_file};
pub use crate::mocks::MockEventSource;
