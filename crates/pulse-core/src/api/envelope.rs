//! List envelope unwrapping.
//!
//! List endpoints answer either with a bare array or with an object holding
//! the array under a resource-specific key. `unwrap_list` resolves
//! `body[key] -> body -> []`; anything that is not an array at the end of
//! that chain yields an empty list.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

pub fn unwrap_list<T: DeserializeOwned>(body: Value, key: &str) -> Vec<T> {
    let items = match body {
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Array(items)) => items,
            _ => {
                warn!(envelope = key, "List envelope missing, treating as empty");
                Vec::new()
            }
        },
        Value::Array(items) => items,
        _ => Vec::new(),
    };

    let total = items.len();
    let parsed: Vec<T> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(envelope = key, error = %e, "Skipping malformed list element");
                None
            }
        })
        .collect();

    if parsed.len() != total {
        warn!(envelope = key, total, kept = parsed.len(), "Dropped malformed list elements");
    }
    parsed
}
