//! Error types produced while assembling a configuration document.

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::catalog::SourceOrigin;
use crate::secrets::DecryptFailure;

/// Boxed error source used where the concrete parser error type is not part
/// of the public API.
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Result alias used throughout the crate.
pub type ConfstackResult<T> = Result<T, ConfstackError>;

/// Errors that abort an assembly run.
///
/// Every variant carries the offending path (or other context) so the
/// caller can render a useful message without re-deriving it. No variant
/// ever carries key material or decrypted content.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfstackError {
    /// A declared source path does not exist.
    #[error("{origin} source '{path}' does not exist")]
    SourceNotFound {
        /// Path that could not be found.
        path: Utf8PathBuf,
        /// Where the path was declared.
        origin: SourceOrigin,
    },

    /// No recognised manifest file exists in the root directory.
    #[error("no manifest found in '{directory}' (looked for {candidates})")]
    ManifestMissing {
        /// Directory that was searched.
        directory: Utf8PathBuf,
        /// Comma-separated list of the file names that were tried.
        candidates: String,
    },

    /// A manifest file exists but could not be read or parsed.
    #[error("failed to load manifest '{path}': {source}")]
    Manifest {
        /// Manifest path.
        path: Utf8PathBuf,
        /// Underlying read or parse failure.
        #[source]
        source: BoxedSource,
    },

    /// Reading a source file into the staging store failed.
    #[error("failed to stage '{path}': {source}")]
    StageIo {
        /// Path being staged.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A staging operation referenced a path that was never staged.
    #[error("'{path}' is not present in the staging store")]
    UnknownPath {
        /// Requested path.
        path: Utf8PathBuf,
    },

    /// A secret file failed to decrypt.
    #[error("failed to decrypt '{path}': {source}")]
    Decrypt {
        /// Secret file path.
        path: Utf8PathBuf,
        /// Reason for the failure.
        #[source]
        source: DecryptFailure,
    },

    /// A fragment could not be parsed as a document under the strict policy.
    #[error("failed to parse '{path}': {source}")]
    Parse {
        /// Fragment path.
        path: Utf8PathBuf,
        /// Underlying parse failure.
        #[source]
        source: BoxedSource,
    },

    /// The merged document could not be serialised.
    #[error("failed to serialise merged document: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Settings could not be gathered from the environment or overrides.
    #[error("invalid settings: {0}")]
    Settings(#[from] Box<figment::Error>),
}

impl ConfstackError {
    pub(crate) fn stage_io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::StageIo {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(path: impl Into<Utf8PathBuf>, source: impl Into<BoxedSource>) -> Self {
        Self::Parse {
            path: path.into(),
            source: source.into(),
        }
    }

    pub(crate) fn manifest(path: impl Into<Utf8PathBuf>, source: impl Into<BoxedSource>) -> Self {
        Self::Manifest {
            path: path.into(),
            source: source.into(),
        }
    }
}

impl From<figment::Error> for ConfstackError {
    fn from(err: figment::Error) -> Self {
        Self::Settings(Box::new(err))
    }
}
