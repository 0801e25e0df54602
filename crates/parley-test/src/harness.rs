//! Logging and config-file helpers for tests.

use std::io::Write;

use tempfile::NamedTempFile;
use tracing_subscriber::EnvFilter;

/// Route `tracing` output through the test writer, filtered by `filter`.
///
/// Captured output only shows for failing tests. The first call in a test
/// binary wins; later calls are no-ops.
pub fn setup_test_logging(filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_test_writer()
        .try_init();
}

/// [`setup_test_logging`] at `warn`, which surfaces swallowed faults such as
/// panicking predicates.
pub fn setup_test_logging_default() {
    setup_test_logging("warn");
}

/// A temporary `.toml` file holding `content`, removed when dropped.
///
/// # Panics
///
/// Panics if the temporary file cannot be written.
#[must_use]
pub fn test_config_file(content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .prefix("parley-")
        .suffix(".toml")
        .tempfile()
        .expect("create temp config");
    writeln!(file, "{content}").expect("write temp config");
    file
}
