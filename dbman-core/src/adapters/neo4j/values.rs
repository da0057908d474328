//! Rendering of property values decoded from Bolt.

use serde_json::{Map, Value};

/// Cypher type name of a decoded value.
pub fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}

/// Renders a value as a flat string: scalars plainly, lists and maps as JSON.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Keys of a property map in the order given by `order`, followed by any
/// keys `order` did not list.
pub fn ordered_keys<'a>(order: &'a [String], props: &'a Map<String, Value>) -> Vec<&'a str> {
    let mut keys: Vec<&str> = order
        .iter()
        .map(String::as_str)
        .filter(|k| props.contains_key(*k))
        .collect();
    for key in props.keys() {
        if !order.iter().any(|k| k == key) {
            keys.push(key);
        }
    }
    keys
}
