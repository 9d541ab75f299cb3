//! Folding staged fragments into one document.
//!
//! The engine owns a single accumulator, initially an empty mapping, and
//! merges each fragment into it in catalog order. Within a catalog entry the
//! staged files are visited in walk order, so repeated runs over the same
//! tree produce the same document.

mod document;
mod value;

use camino::Utf8Path;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::ConfstackResult;
use crate::catalog::SourceEntry;
use crate::staging::StagingFs;

pub use document::{ParsePolicy, parse_fragment};
pub use value::{SequenceDirective, merge_value};

/// Identity key used when none is configured.
pub const DEFAULT_IDENTITY_KEY: &str = "name";

/// Tuning for a merge run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MergeOptions {
    /// Keys used to match mapping elements across sequences, in priority
    /// order.
    pub identity_keys: Vec<String>,
    /// Handling of fragments that do not parse as mappings.
    pub parse_policy: ParsePolicy,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            identity_keys: vec![DEFAULT_IDENTITY_KEY.to_owned()],
            parse_policy: ParsePolicy::default(),
        }
    }
}

/// Single-use merge state for one run.
///
/// # Examples
///
/// ```rust
/// use camino::Utf8Path;
/// use confstack::merge::{MergeEngine, MergeOptions};
/// use serde_json::json;
///
/// # fn main() -> confstack::ConfstackResult<()> {
/// let options = MergeOptions::default();
/// let mut engine = MergeEngine::new(&options);
/// engine.merge_fragment(Utf8Path::new("a.yaml"), b"a: 1\nb: 2\n")?;
/// engine.merge_fragment(Utf8Path::new("b.yaml"), b"b: 3\nc: 4\n")?;
/// assert_eq!(engine.finish(), json!({"a": 1, "b": 3, "c": 4}));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MergeEngine<'a> {
    options: &'a MergeOptions,
    accumulator: Value,
    fragments: usize,
}

impl<'a> MergeEngine<'a> {
    /// Start with an empty mapping.
    #[must_use]
    pub fn new(options: &'a MergeOptions) -> Self {
        Self {
            options,
            accumulator: Value::Object(Map::new()),
            fragments: 0,
        }
    }

    /// Parse `bytes` and fold the resulting document into the accumulator.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfstackError::Parse`] when the fragment does not
    /// parse and the policy is [`ParsePolicy::Strict`].
    pub fn merge_fragment(&mut self, path: &Utf8Path, bytes: &[u8]) -> ConfstackResult<()> {
        let document = parse_fragment(path, bytes, self.options.parse_policy)?;
        self.merge_document(document);
        self.fragments += 1;
        debug!(path = %path, "merged fragment");
        Ok(())
    }

    /// Fold an already parsed mapping into the accumulator.
    pub fn merge_document(&mut self, document: Map<String, Value>) {
        merge_value(
            &mut self.accumulator,
            Value::Object(document),
            &self.options.identity_keys,
        );
    }

    /// Number of fragments merged so far.
    #[must_use]
    pub const fn fragments(&self) -> usize {
        self.fragments
    }

    /// Consume the engine and return the merged document.
    #[must_use]
    pub fn finish(self) -> Value {
        self.accumulator
    }
}

/// Merge every staged file reachable from `entries`, in order.
///
/// # Errors
///
/// Returns [`crate::ConfstackError::UnknownPath`] when an entry was not
/// staged and [`crate::ConfstackError::Parse`] for strict parse failures.
pub fn merge_sources(
    entries: &[SourceEntry],
    staging: &StagingFs,
    options: &MergeOptions,
) -> ConfstackResult<Value> {
    let mut engine = MergeEngine::new(options);
    for entry in entries {
        for path in staging.walk(entry.path())? {
            engine.merge_fragment(path, staging.read(path)?)?;
        }
    }
    info!(fragments = engine.fragments(), "merged fragments");
    Ok(engine.finish())
}
