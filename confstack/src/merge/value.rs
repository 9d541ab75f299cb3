//! Deep merge of JSON-shaped documents.

use serde_json::{Map, Value};

/// Sequence merge directive carried as the first element of a sequence.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SequenceDirective {
    /// Replace the earlier sequence.
    Replace,
    /// Append to the earlier sequence.
    Append,
    /// Prepend to the earlier sequence.
    Prepend,
    /// Merge element-wise by index.
    Inline,
    /// Merge by identity key; `None` uses the first configured key.
    MergeOn(Option<String>),
}

impl SequenceDirective {
    /// Parse a `(( op ))` marker.
    ///
    /// Returns `None` for ordinary data.
    #[must_use]
    pub fn parse(marker: &str) -> Option<Self> {
        let inner = marker.trim().strip_prefix("((")?.strip_suffix("))")?;
        let words: Vec<&str> = inner.split_whitespace().collect();
        match words.as_slice() {
            ["replace"] => Some(Self::Replace),
            ["append"] => Some(Self::Append),
            ["prepend"] => Some(Self::Prepend),
            ["inline"] => Some(Self::Inline),
            ["merge"] => Some(Self::MergeOn(None)),
            ["merge", "on", key] => Some(Self::MergeOn(Some((*key).to_owned()))),
            _ => None,
        }
    }
}

/// Overlay `layer` onto `target`, updating `target` in place.
///
/// Behaviour:
/// - Mappings merge key by key; keys present only on one side are kept.
/// - A `null` value under a key removes that key from `target`.
/// - Sequences replace `target`, unless every element on both sides is a
///   mapping carrying the same identity key, in which case matching
///   elements merge in place and new ones are appended. A leading
///   `(( op ))` element selects another strategy explicitly.
/// - Scalars replace `target` whatever its type.
///
/// Values copied into `target` are resolved against an empty value first,
/// so deletion markers and directives never survive into the result.
///
/// # Examples
///
/// ```rust
/// use confstack::merge::merge_value;
/// use serde_json::json;
///
/// let keys = ["name".to_owned()];
/// let mut acc = json!({"a": 1, "b": {"x": 1}});
/// merge_value(&mut acc, json!({"b": {"y": 2}, "a": null}), &keys);
/// assert_eq!(acc, json!({"b": {"x": 1, "y": 2}}));
/// ```
pub fn merge_value(target: &mut Value, layer: Value, identity_keys: &[String]) {
    match layer {
        Value::Object(map) => merge_object(target, map, identity_keys),
        Value::Array(items) => merge_sequence(target, items, identity_keys),
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => *target = layer,
    }
}

fn resolved(value: Value, identity_keys: &[String]) -> Value {
    let mut fresh = Value::Null;
    merge_value(&mut fresh, value, identity_keys);
    fresh
}

fn merge_object(target: &mut Value, map: Map<String, Value>, identity_keys: &[String]) {
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    let Some(target_map) = target.as_object_mut() else {
        return;
    };

    for (key, value) in map {
        if value.is_null() {
            target_map.remove(&key);
            continue;
        }
        let slot = target_map.entry(key).or_insert(Value::Null);
        merge_value(slot, value, identity_keys);
    }
}

fn merge_sequence(target: &mut Value, mut items: Vec<Value>, identity_keys: &[String]) {
    let directive = items
        .first()
        .and_then(Value::as_str)
        .and_then(SequenceDirective::parse);
    if directive.is_some() {
        items.remove(0);
    }
    let earlier = match target.take() {
        Value::Array(earlier) => earlier,
        _ => Vec::new(),
    };

    let merged = match directive {
        Some(SequenceDirective::Replace) => resolve_all(items, identity_keys),
        Some(SequenceDirective::Append) => {
            let mut merged = earlier;
            merged.extend(resolve_all(items, identity_keys));
            merged
        }
        Some(SequenceDirective::Prepend) => {
            let mut merged = resolve_all(items, identity_keys);
            merged.extend(earlier);
            merged
        }
        Some(SequenceDirective::Inline) => merge_by_index(earlier, items, identity_keys),
        Some(SequenceDirective::MergeOn(explicit)) => {
            match explicit.as_deref().or_else(|| identity_keys.first().map(String::as_str)) {
                Some(key) => merge_by_identity(earlier, items, key, identity_keys),
                None => resolve_all(items, identity_keys),
            }
        }
        None => match shared_identity_key(&earlier, &items, identity_keys) {
            Some(key) => merge_by_identity(earlier, items, key, identity_keys),
            None => resolve_all(items, identity_keys),
        },
    };
    *target = Value::Array(merged);
}

fn resolve_all(items: Vec<Value>, identity_keys: &[String]) -> Vec<Value> {
    items
        .into_iter()
        .map(|item| resolved(item, identity_keys))
        .collect()
}

fn merge_by_index(mut earlier: Vec<Value>, items: Vec<Value>, identity_keys: &[String]) -> Vec<Value> {
    for (index, item) in items.into_iter().enumerate() {
        match earlier.get_mut(index) {
            Some(existing) => merge_value(existing, item, identity_keys),
            None => earlier.push(resolved(item, identity_keys)),
        }
    }
    earlier
}

fn merge_by_identity(
    mut earlier: Vec<Value>,
    items: Vec<Value>,
    key: &str,
    identity_keys: &[String],
) -> Vec<Value> {
    for item in items {
        let position = identity_of(&item, key)
            .and_then(|id| earlier.iter().position(|existing| identity_of(existing, key) == Some(id)));
        match position.and_then(|index| earlier.get_mut(index)) {
            Some(existing) => merge_value(existing, item, identity_keys),
            None => earlier.push(resolved(item, identity_keys)),
        }
    }
    earlier
}

/// First configured identity key carried by every element on both sides.
///
/// Both sequences must be non-empty; a sequence seen for the first time is
/// taken verbatim.
fn shared_identity_key<'a>(
    earlier: &[Value],
    items: &[Value],
    identity_keys: &'a [String],
) -> Option<&'a str> {
    if earlier.is_empty() || items.is_empty() {
        return None;
    }
    identity_keys
        .iter()
        .map(String::as_str)
        .find(|key| {
            earlier
                .iter()
                .chain(items)
                .all(|element| identity_of(element, key).is_some())
        })
}

fn identity_of<'v>(element: &'v Value, key: &str) -> Option<&'v Value> {
    element
        .as_object()
        .and_then(|map| map.get(key))
        .filter(|id| !(id.is_object() || id.is_array() || id.is_null()))
}
