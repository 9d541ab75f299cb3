//! Log output for the binary.
//!
//! Events go to standard error; standard output carries only the document.

use tracing_subscriber::EnvFilter;

use crate::error::CliError;

/// Environment variable holding an `EnvFilter` directive.
pub const LOG_ENV: &str = "CONFSTACK_LOG";

/// Filter used when [`LOG_ENV`] is unset.
#[must_use]
pub const fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns [`CliError::Logging`] if a global subscriber is already set.
pub fn init(verbosity: u8) -> Result<(), CliError> {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(CliError::Logging)
}
