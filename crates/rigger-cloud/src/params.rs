//! Bracketed parameter generation
//!
//! The server-array service takes update parameters in a bracketed
//! form (`server_array[name]`, `inputs[ELB_NAME]`). This flattens a
//! JSON map into that shape, preserving insertion order and recursing
//! into nested objects (`server_array[elasticity][min_count]`).

use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Flatten `entries` under `prefix` into bracketed keys
#[must_use]
pub fn bracketed(prefix: &str, entries: &Map<String, Value>) -> IndexMap<String, Value> {
    let mut out = IndexMap::new();
    flatten(prefix, entries, &mut out);
    out
}

fn flatten(prefix: &str, entries: &Map<String, Value>, out: &mut IndexMap<String, Value>) {
    for (key, value) in entries {
        let name = format!("{prefix}[{key}]");
        match value {
            Value::Object(nested) => flatten(&name, nested, out),
            other => {
                out.insert(name, other.clone());
            }
        }
    }
}

/// Bracketed map rendered as a JSON object body
#[must_use]
pub fn to_body(params: &IndexMap<String, Value>) -> Value {
    let mut map = Map::new();
    for (key, value) in params {
        map.insert(key.clone(), value.clone());
    }
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn flat_entries() {
        let params = bracketed(
            "server_array",
            &obj(json!({"name": "web-v2", "state": "enabled"})),
        );
        assert_eq!(params["server_array[name]"], json!("web-v2"));
        assert_eq!(params["server_array[state]"], json!("enabled"));
    }

    #[test]
    fn nested_entries_recurse() {
        let params = bracketed(
            "server_array",
            &obj(json!({"elasticity": {"min_count": 4}})),
        );
        assert_eq!(params["server_array[elasticity][min_count]"], json!(4));
    }

    #[test]
    fn preserves_insertion_order() {
        let params = bracketed("inputs", &obj(json!({"B": 1, "A": 2, "C": 3})));
        let keys: Vec<&str> = params.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["inputs[B]", "inputs[A]", "inputs[C]"]);
    }
}
