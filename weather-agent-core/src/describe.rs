//! Human-readable parameter inventories injected into LLM prompts.

use serde_json::Value;

use crate::{
    model::{WeatherParameterSet, WeatherRequest},
    schema::schema_for,
};

pub const NO_DESCRIPTION: &str = "No description available";

/// Request fields the model never chooses; they are filled in after generation.
pub const GENERATED_ELSEWHERE: [&str; 3] = ["current", "latitude", "longitude"];

/// Render `name: description` pairs joined by `", "`, in the given order.
pub fn describe_fields<'a, I>(fields: I) -> String
where
    I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
{
    describe_fields_excluding(fields, &[])
}

/// Like [`describe_fields`] but skips the names in `exclude`.
pub fn describe_fields_excluding<'a, I>(fields: I, exclude: &[&str]) -> String
where
    I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
{
    fields
        .into_iter()
        .filter(|(name, _)| !exclude.contains(name))
        .map(|(name, description)| {
            let description = description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .unwrap_or(NO_DESCRIPTION);
            format!("{name}: {description}")
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// `(name, description)` for every top-level property of an object schema,
/// in declaration order.
pub fn schema_fields(schema: &Value) -> Vec<(&str, Option<&str>)> {
    schema
        .get("properties")
        .and_then(Value::as_object)
        .map(|props| {
            props
                .iter()
                .map(|(name, prop)| {
                    (name.as_str(), prop.get("description").and_then(Value::as_str))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Inventory of every current-weather parameter.
pub fn weather_parameters_description() -> String {
    let schema = schema_for::<WeatherParameterSet>();
    describe_fields(schema_fields(&schema))
}

/// Inventory of the request options the model picks (units, formats, models).
pub fn weather_request_parameters_description() -> String {
    let schema = schema_for::<WeatherRequest>();
    describe_fields_excluding(schema_fields(&schema), &GENERATED_ELSEWHERE)
}
