//! Parsing staged fragments into documents.

use std::fmt;

use camino::Utf8Path;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde_json::{Map, Number, Value};
use serde_saphyr::Options;
use tracing::{debug, warn};

use crate::{ConfstackError, ConfstackResult};

/// How fragments that are not mapping documents are handled.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ParsePolicy {
    /// Log a warning and treat the fragment as an empty mapping.
    #[default]
    SkipInvalid,
    /// Abort the run with [`ConfstackError::Parse`].
    Strict,
}

/// Parse staged `bytes` into a top-level mapping.
///
/// Only the first YAML document of a fragment is used; later documents must
/// still be well formed. Empty and `null` documents yield an empty mapping.
/// Plain `null`, `~` and empty values become JSON `null`, while quoted
/// forms such as `'null'` stay strings. Invalid UTF-8, malformed YAML and
/// documents whose top level is not a mapping are failures handled
/// according to `policy`.
///
/// # Errors
///
/// Returns [`ConfstackError::Parse`] for a failure under
/// [`ParsePolicy::Strict`].
pub fn parse_fragment(
    path: &Utf8Path,
    bytes: &[u8],
    policy: ParsePolicy,
) -> ConfstackResult<Map<String, Value>> {
    match parse_mapping(path, bytes) {
        Ok(map) => Ok(map),
        Err(reason) => match policy {
            ParsePolicy::Strict => Err(ConfstackError::parse(path, reason)),
            ParsePolicy::SkipInvalid => {
                warn!(path = %path, %reason, "skipping fragment that is not a mapping document");
                Ok(Map::new())
            }
        },
    }
}

fn parse_mapping(path: &Utf8Path, bytes: &[u8]) -> Result<Map<String, Value>, String> {
    let text = std::str::from_utf8(bytes).map_err(|err| format!("invalid UTF-8: {err}"))?;
    if text.trim().is_empty() {
        return Ok(Map::new());
    }
    let documents: Vec<Node> = serde_saphyr::from_multiple_with_options(
        text,
        Options {
            strict_booleans: true,
            ..Options::default()
        },
    )
    .map_err(|err| err.to_string())?;
    if documents.len() > 1 {
        debug!(path = %path, documents = documents.len(), "ignoring documents after the first");
    }
    match documents.into_iter().next().map(|node| node.0) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(Value::Array(_)) => Err("top-level document is a sequence".to_owned()),
        Some(Value::Bool(_) | Value::Number(_) | Value::String(_)) => {
            Err("top-level document is a scalar".to_owned())
        }
    }
}

/// A YAML node read as JSON.
///
/// Each node is requested as an option first, so plain null scalars surface
/// as [`Value::Null`] instead of their literal text.
struct Node(Value);

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_option(NodeVisitor)
    }
}

struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = Node;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a YAML node")
    }

    fn visit_none<E: de::Error>(self) -> Result<Node, E> {
        Ok(Node(Value::Null))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Node, E> {
        Ok(Node(Value::Null))
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Node, D::Error> {
        deserializer.deserialize_any(Self)
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> Result<Node, E> {
        Ok(Node(Value::Bool(value)))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Node, E> {
        Ok(Node(Value::Number(value.into())))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Node, E> {
        Ok(Node(Value::Number(value.into())))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Node, E> {
        Ok(Node(Number::from_f64(value).map_or(Value::Null, Value::Number)))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Node, E> {
        Ok(Node(Value::String(value.to_owned())))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<Node, E> {
        Ok(Node(Value::String(value)))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Node, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or_default());
        while let Some(Node(item)) = seq.next_element::<Node>()? {
            items.push(item);
        }
        Ok(Node(Value::Array(items)))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Node, A::Error> {
        let mut map = Map::new();
        while let Some((key, Node(item))) = access.next_entry::<String, Node>()? {
            map.insert(key, item);
        }
        Ok(Node(Value::Object(map)))
    }
}
