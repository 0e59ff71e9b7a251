//! Loosely typed payload values
//!
//! Options, details and call arguments travel as dynamic values. Helpers in
//! this module perform the shape-checked extraction the pipeline relies on.

pub use serde_json::Value;

/// String-keyed dictionary of dynamic values
pub type Dict = serde_json::Map<String, Value>;

/// Read a string option, returning `""` when absent or not a string
pub fn option_str<'a>(dict: &'a Dict, key: &str) -> &'a str {
    dict.get(key).and_then(Value::as_str).unwrap_or("")
}

/// Read a boolean flag, returning `false` when absent or not a boolean
pub fn option_flag(dict: &Dict, key: &str) -> bool {
    dict.get(key).and_then(Value::as_bool).unwrap_or(false)
}

/// Interpret a value as a numeric identifier
///
/// Accepts unsigned integers and integral floats (some serializers emit
/// ids as floating point numbers).
pub fn as_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        }),
        _ => None,
    }
}

/// Interpret a value as a string or a list of strings
///
/// Non-string list members are skipped. Returns `None` for any other shape.
pub fn as_string_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::String(s) => Some(vec![s.clone()]),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
        ),
        _ => None,
    }
}
