//! JSON Schema helpers for structured LLM output.
//!
//! Schemas are derived from the Rust types with [`schemars`] and then
//! normalized by [`strictify`] into the strict dialect accepted by
//! `response_format = json_schema` with `strict: true`: every object forbids
//! unknown keys and lists all of its properties as required.

use schemars::{JsonSchema, generate::SchemaSettings};
use serde_json::{Map, Value};

const COMBINATORS: [&str; 3] = ["anyOf", "oneOf", "allOf"];

/// Derive the JSON Schema for `T` without the meta-schema link.
pub fn schema_for<T: JsonSchema>() -> Value {
    let generator = SchemaSettings::default()
        .with(|s| s.meta_schema = None)
        .into_generator();

    generator.into_root_schema_for::<T>().to_value()
}

/// Return a strict copy of `schema`.
///
/// - `object` nodes get `additionalProperties: false`; when they declare
///   `properties`, `required` becomes exactly the property names in their
///   existing order and every property schema is strictified.
/// - `array` nodes have their `items` strictified.
/// - Every member of `anyOf` / `oneOf` / `allOf` and every `$defs` entry is
///   strictified.
///
/// All rules that match a node are applied. Anything else is copied as is,
/// which makes the function idempotent.
pub fn strictify(schema: &Value) -> Value {
    let Value::Object(node) = schema else {
        return schema.clone();
    };

    let kind = node.get("type").and_then(Value::as_str);
    let mut out = Map::with_capacity(node.len() + 2);

    for (key, value) in node {
        let value = match (key.as_str(), value) {
            ("properties", Value::Object(props)) if kind == Some("object") => {
                Value::Object(strictify_entries(props))
            }
            ("items", items) if kind == Some("array") => strictify(items),
            ("$defs", Value::Object(defs)) => Value::Object(strictify_entries(defs)),
            (combinator, Value::Array(members)) if COMBINATORS.contains(&combinator) => {
                Value::Array(members.iter().map(strictify).collect())
            }
            _ => value.clone(),
        };
        out.insert(key.clone(), value);
    }

    if kind == Some("object") {
        out.insert("additionalProperties".to_string(), Value::Bool(false));

        if let Some(Value::Object(props)) = node.get("properties") {
            let required = props.keys().cloned().map(Value::String).collect();
            out.insert("required".to_string(), Value::Array(required));
        }
    }

    Value::Object(out)
}

fn strictify_entries(entries: &Map<String, Value>) -> Map<String, Value> {
    entries
        .iter()
        .map(|(name, schema)| (name.clone(), strictify(schema)))
        .collect()
}

/// Remove the named top-level properties from an object schema.
///
/// Used to hide fields from the model that are filled in afterwards. The
/// remaining properties and `required` entries keep their order.
pub fn without_properties(mut schema: Value, names: &[&str]) -> Value {
    if let Some(Value::Object(props)) = schema.get_mut("properties") {
        for name in names {
            props.shift_remove(*name);
        }
    }
    if let Some(Value::Array(required)) = schema.get_mut("required") {
        required.retain(|r| !r.as_str().is_some_and(|r| names.contains(&r)));
    }
    schema
}
