//! Error types for the `confstack` binary.

use camino::Utf8PathBuf;
use confstack::{BoxedSource, ConfstackError};
use thiserror::Error;

/// Errors surfaced by the command-line pipeline.
#[derive(Debug, Error)]
pub enum CliError {
    /// Assembly failed.
    #[error(transparent)]
    Assemble(#[from] ConfstackError),

    /// The output file could not be written.
    #[error("failed to write output to '{path}': {source}")]
    Output {
        /// Output file path.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Standard output could not be written.
    #[error("failed to write output to standard output: {0}")]
    Stdout(#[source] std::io::Error),

    /// The log subscriber could not be installed.
    #[error("failed to install logging: {0}")]
    Logging(#[source] BoxedSource),
}

/// Exit status for a manifest that is missing or unreadable.
pub const EXIT_MANIFEST: u8 = 2;
/// Exit status for a secret file that fails to decrypt.
pub const EXIT_DECRYPT: u8 = 3;
/// Exit status for invalid settings (`EX_USAGE`).
pub const EXIT_USAGE: u8 = 64;
/// Exit status for every other failure.
pub const EXIT_FAILURE: u8 = 1;

impl CliError {
    /// Process exit status for this failure.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Assemble(err) => match err {
                ConfstackError::ManifestMissing { .. } | ConfstackError::Manifest { .. } => {
                    EXIT_MANIFEST
                }
                ConfstackError::Decrypt { .. } => EXIT_DECRYPT,
                ConfstackError::Settings(_) => EXIT_USAGE,
                _ => EXIT_FAILURE,
            },
            Self::Output { .. } | Self::Stdout(_) | Self::Logging(_) => EXIT_FAILURE,
        }
    }
}
