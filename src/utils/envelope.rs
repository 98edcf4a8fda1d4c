//! Helpers for the backend's inconsistent response envelopes.
//!
//! Depending on the endpoint the backend answers with `{success, data}`,
//! with Laravel pagination (`{data: {data: [...]}}`), with a resource
//! specific wrapper such as `{cards: [...]}`, or with the bare payload.

use serde_json::Value;

/// Keys that may wrap a list payload
const LIST_WRAPPERS: &[&str] = &["data", "cards"];

/// `body.data` when present and not null, otherwise the body itself
pub fn unwrap_data(body: Value) -> Value {
    match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(data) if !data.is_null() => data,
            Some(_) | None => Value::Object(map),
        },
        other => other,
    }
}

/// Descend through known wrappers until an array shows up.
///
/// Anything that does not lead to an array yields an empty list.
pub fn unwrap_list(body: Value) -> Vec<Value> {
    let mut current = body;
    loop {
        match current {
            Value::Array(items) => return items,
            Value::Object(mut map) => {
                let next = LIST_WRAPPERS
                    .iter()
                    .find_map(|key| map.remove(*key).filter(|v| !v.is_null()));
                match next {
                    Some(inner) => current = inner,
                    None => return Vec::new(),
                }
            }
            _ => return Vec::new(),
        }
    }
}
