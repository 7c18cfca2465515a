// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::Value;

/// Recursively drop nulls and empty maps/lists.
///
/// Applied bottom-up, so a map whose members were all pruned disappears too.
///
/// ```rust
/// use serde_json::json;
/// use stream_upload::utils::prune_empty;
///
/// let pruned = prune_empty(json!({"a": null, "b": {"c": null}, "d": [], "e": 0}));
/// assert_eq!(pruned, Some(json!({"e": 0})));
/// ```
pub fn prune_empty(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(map) => {
            let pruned: serde_json::Map<String, Value> = map
                .into_iter()
                .filter_map(|(k, v)| prune_empty(v).map(|v| (k, v)))
                .collect();
            (!pruned.is_empty()).then_some(Value::Object(pruned))
        }
        Value::Array(items) => {
            let pruned: Vec<Value> = items.into_iter().filter_map(prune_empty).collect();
            (!pruned.is_empty()).then_some(Value::Array(pruned))
        }
        other => Some(other),
    }
}

/// `camelCase`, `snake_case` or `Title Case` to `kebab-case`.
///
/// ```rust
/// use stream_upload::utils::kebab_case;
///
/// assert_eq!(kebab_case("contentType"), "content-type");
/// assert_eq!(kebab_case("cameraISO"), "camera-iso");
/// assert_eq!(kebab_case("gps_latitude"), "gps-latitude");
/// ```
pub fn kebab_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !out.is_empty() && !out.ends_with('-') {
                out.push('-');
            }
            continue;
        }

        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).map_or(false, |n| n.is_lowercase());
            let boundary = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower);
            if boundary && !out.is_empty() && !out.ends_with('-') {
                out.push('-');
            }
        }
        out.extend(c.to_lowercase());
    }

    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// Plain-text form of a metadata value for object attributes.
pub fn attribute_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
