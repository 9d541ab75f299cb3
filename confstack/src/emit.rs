//! Canonical JSON output.
//!
//! The merged document is rendered with one-space indentation, keys sorted
//! at every level and a trailing newline, so unchanged inputs always yield
//! identical bytes.

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Value;
use serde_json::ser::PrettyFormatter;

use crate::ConfstackResult;

const INDENT: &[u8] = b" ";

/// Serializes a [`Value`] with lexicographically ordered mapping keys,
/// independent of the map implementation `serde_json` was built with.
struct Canonical<'a>(&'a Value);

impl Serialize for Canonical<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Value::Object(map) => {
                let mut entries: Vec<(&String, &Value)> = map.iter().collect();
                entries.sort_unstable_by(|left, right| left.0.cmp(right.0));
                let mut out = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    out.serialize_entry(key, &Canonical(value))?;
                }
                out.end()
            }
            Value::Array(items) => {
                let mut out = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    out.serialize_element(&Canonical(item))?;
                }
                out.end()
            }
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
                self.0.serialize(serializer)
            }
        }
    }
}

/// Render `document` as canonical JSON bytes.
///
/// # Examples
///
/// ```rust
/// use confstack::emit::to_canonical_json;
/// use serde_json::json;
///
/// # fn main() -> confstack::ConfstackResult<()> {
/// let bytes = to_canonical_json(&json!({"b": [1], "a": true}))?;
/// assert_eq!(bytes, b"{\n \"a\": true,\n \"b\": [\n  1\n ]\n}\n");
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns [`crate::ConfstackError::Serialize`] if serialization fails,
/// which indicates a broken in-memory document.
pub fn to_canonical_json(document: &Value) -> ConfstackResult<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(INDENT));
    Canonical(document).serialize(&mut serializer)?;
    buffer.push(b'\n');
    Ok(buffer)
}
