//! Decryption of secret fragments inside the staging store.
//!
//! Staged files whose extension matches the configured secret suffix are
//! passed through a [`Decrypter`] and their staged bytes are replaced with
//! the plaintext. The path is unchanged, so the merge step parses the
//! plaintext without knowing a decryption happened. Any failure aborts the
//! run: a partially decrypted fragment set is never merged.

mod ejson;

use std::fmt;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::staging::StagingFs;
use crate::{ConfstackError, ConfstackResult};

pub use ejson::{DEFAULT_KEY_DIR, EjsonDecrypter};

/// Opaque credential handed to the decryption primitive.
///
/// The `Debug` representation is redacted so the value cannot leak through
/// logs or error reports.
#[derive(Clone, Deserialize, Serialize, Eq, PartialEq)]
#[serde(transparent)]
pub struct KeyMaterial(String);

impl KeyMaterial {
    /// Wrap a credential.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Borrow the raw credential.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the credential is blank.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyMaterial(<redacted>)")
    }
}

/// Reasons a secret file could not be decrypted.
///
/// Messages are fixed strings; none of them include key material or
/// recovered plaintext.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DecryptFailure {
    /// The file is not a JSON object.
    #[error("secret file is not a JSON object")]
    InvalidDocument,
    /// The `_public_key` field is absent.
    #[error("secret file has no _public_key field")]
    MissingPublicKey,
    /// The `_public_key` field is not 32 hex-encoded bytes.
    #[error("secret file _public_key is not a valid key")]
    InvalidPublicKey,
    /// The configured private key is not 32 hex-encoded bytes.
    #[error("configured private key is not a valid key")]
    InvalidPrivateKey,
    /// The private key does not belong to the file's public key.
    #[error("configured private key does not match the file's public key")]
    KeyMismatch,
    /// No private key was configured and none exists in the key directory.
    #[error("no private key for public key {public_key} in '{key_dir}'")]
    KeyNotFound {
        /// Public key the file was encrypted for.
        public_key: String,
        /// Directory that was searched.
        key_dir: camino::Utf8PathBuf,
    },
    /// A value is not a well-formed encrypted message.
    #[error("secret file contains a malformed encrypted value")]
    MalformedMessage,
    /// An encrypted value failed authentication.
    #[error("an encrypted value failed authentication")]
    AuthenticationFailed,
    /// A decrypted value is not valid UTF-8.
    #[error("a decrypted value is not valid UTF-8")]
    NonUtf8Plaintext,
    /// The decrypted document could not be rendered.
    #[error("decrypted document could not be rendered")]
    Render,
}

/// Decryption primitive used by [`materialize`].
pub trait Decrypter {
    /// Decrypt the staged `ciphertext` of `path` with `key`.
    ///
    /// When `key` is `None` the implementation may look the key up by other
    /// means.
    ///
    /// # Errors
    ///
    /// Returns a [`DecryptFailure`] describing why the file cannot be
    /// decrypted.
    fn decrypt(
        &self,
        path: &Utf8Path,
        ciphertext: &[u8],
        key: Option<&KeyMaterial>,
    ) -> Result<Vec<u8>, DecryptFailure>;
}

/// Whether `path` carries the secret `suffix` as its extension.
///
/// The comparison is exact; a leading dot on `suffix` is optional.
#[must_use]
pub fn matches_suffix(path: &Utf8Path, suffix: &str) -> bool {
    let wanted = suffix.strip_prefix('.').unwrap_or(suffix);
    !wanted.is_empty() && path.extension() == Some(wanted)
}

/// Decrypt every staged secret file in place.
///
/// Each staged path is decrypted at most once: entries that were already
/// rewritten are left alone. Returns the number of files decrypted.
///
/// # Errors
///
/// Returns [`ConfstackError::Decrypt`] naming the first file that fails.
pub fn materialize(
    staging: &mut StagingFs,
    suffix: &str,
    key: Option<&KeyMaterial>,
    decrypter: &dyn Decrypter,
) -> ConfstackResult<usize> {
    let pending: Vec<_> = staging
        .paths()
        .filter(|path| matches_suffix(path, suffix) && !staging.is_rewritten(path))
        .map(ToOwned::to_owned)
        .collect();

    for path in &pending {
        let plaintext = decrypter
            .decrypt(path, staging.read(path)?, key)
            .map_err(|source| ConfstackError::Decrypt {
                path: path.clone(),
                source,
            })?;
        staging.overwrite(path, plaintext)?;
        debug!(path = %path, "decrypted secret file");
    }
    info!(files = pending.len(), "materialised secrets");
    Ok(pending.len())
}
