//! Built-in capabilities

mod databricks;
mod server;
mod snowflake;

use serde_json::{Map, Value};

use crate::registry::Registry;

/// Registry holding every built-in capability
pub fn builtin() -> Registry {
    let mut registry = Registry::new();
    server::register(&mut registry);
    databricks::register(&mut registry);
    snowflake::register(&mut registry);
    registry
}

/// Capability payload from a `json!` object literal
fn payload(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("result".to_owned(), other);
            map
        }
    }
}
