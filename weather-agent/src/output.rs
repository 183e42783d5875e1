use std::fmt::{self, Write};

use chrono::{DateTime, FixedOffset};
use weather_agent_core::WeatherResponse;

const OBSERVED_FORMAT: &str = "%Y-%m-%d %H:%M %:z";

/// Human-readable rendering of a current-conditions response.
pub fn current_conditions(response: &WeatherResponse) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_conditions(&mut out, response);
    out
}

fn write_conditions(out: &mut impl Write, response: &WeatherResponse) -> fmt::Result {
    writeln!(
        out,
        "Current weather at {:.4}, {:.4} ({}, {})",
        response.latitude, response.longitude, response.timezone, response.timezone_abbreviation
    )?;
    if let Some(observed) = response.observed_at() {
        writeln!(out, "Observed at {}", observed_label(observed))?;
    }

    let Some(current) = &response.current else {
        return writeln!(out, "No current conditions returned.");
    };

    let units = response.current_units.clone().unwrap_or_default();
    for (name, value) in current.values() {
        match units.unit(name) {
            Some(unit) => writeln!(out, "  {name}: {value} {unit}")?,
            None => writeln!(out, "  {name}: {value}")?,
        }
    }

    Ok(())
}

/// Local wall-clock time of the observation, with its UTC offset.
fn observed_label(observed: DateTime<FixedOffset>) -> String {
    observed.format(OBSERVED_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(current: serde_json::Value) -> WeatherResponse {
        let mut value = json!({
            "latitude": 52.52,
            "longitude": 13.419998,
            "generationtime_ms": 0.05,
            "utc_offset_seconds": 3600,
            "timezone": "Europe/Berlin",
            "timezone_abbreviation": "CET",
            "elevation": 38.0,
            "current_units": {"time": "iso8601", "temperature_2m": "°C", "wind_speed_10m": "km/h"}
        });
        if !current.is_null() {
            value["current"] = current;
        }
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn renders_values_with_units_and_local_time() {
        let text = current_conditions(&response(json!({
            "time": "2024-01-01T12:00",
            "interval": 900,
            "temperature_2m": 21.3,
            "wind_speed_10m": 11.2,
            "weather_code": 3.0
        })));

        assert_eq!(
            text,
            "Current weather at 52.5200, 13.4200 (Europe/Berlin, CET)\n\
             Observed at 2024-01-01 12:00 +01:00\n  \
             temperature_2m: 21.3 °C\n  \
             wind_speed_10m: 11.2 km/h\n  \
             weather_code: 3\n"
        );
    }

    #[test]
    fn unix_time_is_converted_to_the_response_offset() {
        let text = current_conditions(&response(json!({
            "time": 1704106800,
            "temperature_2m": 1.0
        })));

        assert!(text.contains("Observed at 2024-01-01 12:00 +01:00"));
    }

    #[test]
    fn observed_label_keeps_the_local_offset() {
        let observed = DateTime::parse_from_rfc3339("2024-07-01T08:30:00-04:00").unwrap();

        assert_eq!(observed_label(observed), "2024-07-01 08:30 -04:00");
    }

    #[test]
    fn missing_current_block_is_reported() {
        let text = current_conditions(&response(serde_json::Value::Null));

        assert!(text.ends_with("No current conditions returned.\n"));
    }
}
