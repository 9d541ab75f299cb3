//! Typed run settings gathered from the environment.
//!
//! Layers, lowest precedence first: built-in defaults, the `ARGOCD_ENV_*`
//! fallbacks, the primary variables and finally caller overrides (the CLI
//! flags).

mod env;

use camino::Utf8PathBuf;
use figment::Figment;
use figment::providers::Serialized;
use serde::{Deserialize, Serialize};

use crate::ConfstackResult;
use crate::catalog::ManifestPolicy;
use crate::merge::{DEFAULT_IDENTITY_KEY, MergeOptions, ParsePolicy};
use crate::secrets::{DEFAULT_KEY_DIR, EjsonDecrypter, KeyMaterial};

pub use env::SettingsEnv;

/// Settings for one assembly run.
#[derive(Clone, Debug, Deserialize, Serialize, Eq, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Base tree to scan and merge.
    pub root_directory: Utf8PathBuf,
    /// Roots merged before the root directory, in order.
    pub extra_directories: Vec<Utf8PathBuf>,
    /// Extension of secret files routed through decryption.
    pub secret_suffix: String,
    /// Private key for secret files; the key directory is used when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<KeyMaterial>,
    /// Directory holding private keys named after their public key.
    pub key_dir: Utf8PathBuf,
    /// Variable file pattern. Reserved; not consumed by the merge.
    pub var_file_pattern: String,
    /// Build options passed through untouched.
    pub kustomize_build_options: String,
    /// Abort on fragments that do not parse instead of skipping them.
    pub strict_parse: bool,
    /// Continue without manifest resources when no manifest exists.
    pub allow_missing_manifest: bool,
    /// Identity keys for sequence merging, in priority order.
    pub identity_keys: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            root_directory: Utf8PathBuf::from("."),
            extra_directories: Vec::new(),
            secret_suffix: ".ejson".to_owned(),
            secret_key: None,
            key_dir: Utf8PathBuf::from(DEFAULT_KEY_DIR),
            var_file_pattern: "*.vars".to_owned(),
            kustomize_build_options: String::new(),
            strict_parse: false,
            allow_missing_manifest: false,
            identity_keys: vec![DEFAULT_IDENTITY_KEY.to_owned()],
        }
    }
}

impl Settings {
    /// Defaults layered with the environment.
    #[must_use]
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(SettingsEnv::fallback())
            .merge(SettingsEnv::primary())
    }

    /// Load settings from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfstackError::Settings`] when a variable has an
    /// invalid value.
    pub fn load() -> ConfstackResult<Self> {
        Ok(Self::figment().extract()?)
    }

    /// Load settings from the environment with `overrides` merged on top.
    ///
    /// Fields omitted when `overrides` serializes leave the lower layers
    /// intact.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfstackError::Settings`] when a variable or an
    /// override has an invalid value.
    pub fn load_with_overrides<T: Serialize>(overrides: &T) -> ConfstackResult<Self> {
        Ok(Self::figment()
            .merge(Serialized::defaults(overrides))
            .extract()?)
    }

    /// Configured key material, ignoring blank values.
    #[must_use]
    pub fn secret_key(&self) -> Option<&KeyMaterial> {
        self.secret_key.as_ref().filter(|key| !key.is_blank())
    }

    /// Merge tuning derived from these settings.
    #[must_use]
    pub fn merge_options(&self) -> MergeOptions {
        MergeOptions {
            identity_keys: self.identity_keys.clone(),
            parse_policy: if self.strict_parse {
                ParsePolicy::Strict
            } else {
                ParsePolicy::SkipInvalid
            },
        }
    }

    /// How a missing manifest is handled.
    #[must_use]
    pub const fn manifest_policy(&self) -> ManifestPolicy {
        if self.allow_missing_manifest {
            ManifestPolicy::Optional
        } else {
            ManifestPolicy::Required
        }
    }

    /// EJSON decrypter reading fallback keys from [`Self::key_dir`].
    #[must_use]
    pub fn decrypter(&self) -> EjsonDecrypter {
        EjsonDecrypter::new(self.key_dir.clone())
    }
}
