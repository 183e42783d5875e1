//! Query-string construction for the Open-Meteo forecast endpoint.
//!
//! Only values that differ from Open-Meteo's own defaults are sent, which
//! keeps the outbound query minimal. Each optional field has its own entry in
//! [`optional_fields`] because the defaults (and the `models` sentinel rule)
//! differ per field.

use serde_json::{Map, Value};

use crate::model::{
    CellSelection, MODELS_PLACEHOLDER, PrecipitationUnit, TemperatureUnit, TimeFormat,
    WeatherRequest, WindSpeedUnit, DEFAULT_TIMEZONE,
};

/// Flat query-parameter mapping sent to Open-Meteo.
pub type QueryParams = Map<String, Value>;

/// Build the forecast query for `request`.
///
/// `latitude` and `longitude` are always present; every other field only when
/// it is not at its default.
pub fn build_query(request: &WeatherRequest) -> QueryParams {
    let mut params = QueryParams::new();
    params.insert("latitude".to_string(), Value::from(request.latitude));
    params.insert("longitude".to_string(), Value::from(request.longitude));

    for (name, value) in optional_fields(request) {
        if let Some(value) = value {
            params.insert(name.to_string(), value);
        }
    }

    params
}

/// One row per optional field: the wire name and the value to send, if any.
fn optional_fields(request: &WeatherRequest) -> [(&'static str, Option<Value>); 9] {
    [
        ("elevation", request.elevation.map(Value::from)),
        ("current", current_value(request)),
        (
            "temperature_unit",
            unless_default(request.temperature_unit, TemperatureUnit::Celsius),
        ),
        (
            "wind_speed_unit",
            unless_default(request.wind_speed_unit, WindSpeedUnit::Kmh),
        ),
        (
            "precipitation_unit",
            unless_default(request.precipitation_unit, PrecipitationUnit::Mm),
        ),
        ("timeformat", unless_default(request.timeformat, TimeFormat::Iso8601)),
        ("timezone", unless_default(request.timezone.as_str(), DEFAULT_TIMEZONE)),
        ("models", models_value(request.models.as_deref())),
        (
            "cell_selection",
            unless_default(request.cell_selection, CellSelection::Land),
        ),
    ]
}

fn unless_default<T>(value: T, default: T) -> Option<Value>
where
    T: PartialEq + ToString,
{
    (value != default).then(|| Value::String(value.to_string()))
}

fn current_value(request: &WeatherRequest) -> Option<Value> {
    let selected = request.current.as_ref()?.selected();
    (!selected.is_empty()).then(|| Value::String(selected.join(",")))
}

fn models_value(models: Option<&[String]>) -> Option<Value> {
    match models? {
        [] => None,
        [only] if only == MODELS_PLACEHOLDER => None,
        models => Some(Value::String(models.join(","))),
    }
}
