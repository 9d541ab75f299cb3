//! Environment provider for [`super::Settings`].
//!
//! Wraps `figment::providers::Env` and only admits the variables listed in a
//! fixed table. Each variable maps to one settings field and is parsed
//! according to its kind: text is kept verbatim, lists are split on commas
//! and flags accept `true`/`false` (or `1`/`0`). Empty variables are
//! treated as unset.

use std::ops::Deref;

use figment::providers::Env;
use figment::value::{Dict, Map, Value};
use figment::{Error, Metadata, Profile, Provider};
use uncased::Uncased;

/// How an environment value is interpreted.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum VarKind {
    Text,
    List,
    Flag,
}

/// One recognised environment variable.
#[derive(Clone, Copy, Debug)]
struct EnvVar {
    name: &'static str,
    field: &'static str,
    kind: VarKind,
}

const fn var(name: &'static str, field: &'static str, kind: VarKind) -> EnvVar {
    EnvVar { name, field, kind }
}

/// Argo CD plugin variables, consulted before the primary ones.
const FALLBACK_VARS: &[EnvVar] = &[
    var("ARGOCD_ENV_EXTRA_DIRECTORIES", "extra_directories", VarKind::List),
    var("ARGOCD_ENV_SECRET", "secret_key", VarKind::Text),
];

const PRIMARY_VARS: &[EnvVar] = &[
    var("ROOT_DIRECTORY", "root_directory", VarKind::Text),
    var("EXTRA_DIRECTORIES", "extra_directories", VarKind::List),
    var("EJSON_FILE_REGEX", "secret_suffix", VarKind::Text),
    var("EJSON_SECRET", "secret_key", VarKind::Text),
    var("EJSON_KEYDIR", "key_dir", VarKind::Text),
    var("VAR_FILE_REGEX", "var_file_pattern", VarKind::Text),
    var("KUSTOMIZE_BUILD_OPTIONS", "kustomize_build_options", VarKind::Text),
    var("CONFSTACK_STRICT_PARSE", "strict_parse", VarKind::Flag),
    var("CONFSTACK_ALLOW_MISSING_MANIFEST", "allow_missing_manifest", VarKind::Flag),
    var("CONFSTACK_IDENTITY_KEYS", "identity_keys", VarKind::List),
];

/// Environment provider limited to one variable table.
#[derive(Clone)]
pub struct SettingsEnv {
    inner: Env,
    vars: &'static [EnvVar],
}

impl SettingsEnv {
    /// Provider for the primary variables such as `ROOT_DIRECTORY`.
    #[must_use]
    pub fn primary() -> Self {
        Self::from_table(PRIMARY_VARS)
    }

    /// Provider for the `ARGOCD_ENV_*` fallbacks.
    #[must_use]
    pub fn fallback() -> Self {
        Self::from_table(FALLBACK_VARS)
    }

    fn from_table(vars: &'static [EnvVar]) -> Self {
        let inner = Env::raw().filter_map(move |key| {
            vars.iter()
                .find(|candidate| key.as_str().eq_ignore_ascii_case(candidate.name))
                .map(|candidate| Uncased::from(candidate.field))
        });
        Self { inner, vars }
    }

    fn kind_of(&self, field: &str) -> Option<&EnvVar> {
        self.vars.iter().find(|candidate| candidate.field == field)
    }

    fn parse_value(known: &EnvVar, raw: &str) -> Result<Value, Error> {
        let trimmed = raw.trim();
        match known.kind {
            VarKind::Text => Ok(Value::from(trimmed.to_owned())),
            VarKind::List => Ok(split_list(trimmed).into()),
            VarKind::Flag => parse_flag(trimmed).map(Value::from).ok_or_else(|| {
                Error::from(format!(
                    "environment variable `{}` must be true or false",
                    known.name
                ))
            }),
        }
    }
}

fn split_list(raw: &str) -> Vec<Value> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| Value::from(item.to_owned()))
        .collect()
}

fn parse_flag(raw: &str) -> Option<bool> {
    if raw.eq_ignore_ascii_case("true") || raw == "1" {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") || raw == "0" {
        Some(false)
    } else {
        None
    }
}

impl Provider for SettingsEnv {
    fn metadata(&self) -> Metadata {
        self.inner.metadata()
    }

    fn profile(&self) -> Option<Profile> {
        Some(self.inner.profile.clone())
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();
        for (key, raw) in self.inner.iter() {
            let Some(known) = self.kind_of(key.as_str()) else {
                continue;
            };
            // An empty variable counts as unset so later layers still apply.
            if raw.trim().is_empty() {
                continue;
            }
            dict.insert(known.field.to_owned(), Self::parse_value(known, &raw)?);
        }
        Ok(self.inner.profile.collect(dict))
    }
}

impl Deref for SettingsEnv {
    type Target = Env;

    fn deref(&self) -> &Env {
        &self.inner
    }
}
