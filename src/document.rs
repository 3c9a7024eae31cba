//! JSON document helpers: dotted-path lookup, nested writes, leaf expansion and
//! flattening. Document paths never carry braces, so a plain dot split is enough.

use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Value at a dotted path; numeric segments index into arrays
pub fn value_at<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(document);
    }
    path.split('.').try_fold(document, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Write `value` at a dotted path, creating intermediate objects
///
/// Intermediate scalars are replaced by objects. Numeric segments become object keys,
/// which flatten back to the same dotted path.
pub fn set_at(document: &mut Value, path: &str, value: Value) {
    let mut segments = path.split('.').peekable();
    let mut current = document;
    while let Some(segment) = segments.next() {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let map = match current {
            Value::Object(map) => map,
            _ => unreachable!("replaced by an object above"),
        };
        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return;
        }
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}

/// Flatten nested objects into a dotted-path map
///
/// Empty nested objects are kept as values so an existing-but-empty container stays
/// distinguishable from an absent one. Arrays are leaf values.
pub fn flatten(document: &Value) -> BTreeMap<String, Value> {
    let mut flat = BTreeMap::new();
    flatten_into(document, "", &mut flat);
    flat
}

fn flatten_into(value: &Value, prefix: &str, flat: &mut BTreeMap<String, Value>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                flatten_into(child, &join(prefix, key), flat);
            }
        }
        Value::Object(_) if prefix.is_empty() => {}
        _ => {
            flat.insert(prefix.to_string(), value.clone());
        }
    }
}

/// Insert one path per scalar leaf of `value`, rooted at `prefix`
///
/// Objects and arrays are walked; empty containers contribute nothing.
pub fn collect_leaf_paths(value: &Value, prefix: &str, out: &mut BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                collect_leaf_paths(child, &join(prefix, key), out);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                collect_leaf_paths(child, &join(prefix, &index.to_string()), out);
            }
        }
        _ => {
            out.insert(prefix.to_string());
        }
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}
