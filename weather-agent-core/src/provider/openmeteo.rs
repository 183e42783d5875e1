use async_trait::async_trait;
use reqwest::Client;

use crate::{
    model::{WeatherRequest, WeatherResponse},
    params::build_query,
};

use super::{FetchError, WeatherProvider, truncate_body};

pub const DEFAULT_OPEN_METEO_URL: &str = "https://api.open-meteo.com/v1";

#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    base_url: String,
    http: Client,
}

impl Default for OpenMeteoProvider {
    fn default() -> Self {
        Self::new(DEFAULT_OPEN_METEO_URL)
    }
}

impl OpenMeteoProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    async fn current_weather(&self, request: &WeatherRequest) -> Result<WeatherResponse, FetchError> {
        let url = format!("{}/forecast", self.base_url);
        let params = build_query(request);
        tracing::debug!(%url, ?params, "requesting Open-Meteo forecast");

        let res = self
            .http
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(FetchError::Network)?;

        let status = res.status();
        let body = res.text().await.map_err(FetchError::Network)?;

        if !status.is_success() {
            return Err(FetchError::Status { status, body: truncate_body(&body) });
        }

        serde_json::from_str(&body).map_err(FetchError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TemperatureUnit, WeatherParameterSet};
    use reqwest::StatusCode;
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param, query_param_is_missing},
    };

    fn request() -> WeatherRequest {
        let mut request = WeatherRequest::new(52.52, 13.41).with_current(WeatherParameterSet {
            temperature_2m: true,
            wind_speed_10m: true,
            ..Default::default()
        });
        request.temperature_unit = TemperatureUnit::Fahrenheit;
        request
    }

    #[tokio::test]
    async fn sends_minimal_query_and_parses_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .and(query_param("latitude", "52.52"))
            .and(query_param("longitude", "13.41"))
            .and(query_param("current", "temperature_2m,wind_speed_10m"))
            .and(query_param("temperature_unit", "fahrenheit"))
            .and(query_param_is_missing("wind_speed_unit"))
            .and(query_param_is_missing("elevation"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "latitude": 52.52,
                "longitude": 13.419998,
                "generationtime_ms": 0.03,
                "utc_offset_seconds": 0,
                "timezone": "GMT",
                "timezone_abbreviation": "GMT",
                "elevation": 38.0,
                "current_units": {"time": "iso8601", "interval": "seconds", "temperature_2m": "°F", "wind_speed_10m": "km/h"},
                "current": {"time": "2024-01-01T12:00", "interval": 900, "temperature_2m": 38.1, "wind_speed_10m": 11.2}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = OpenMeteoProvider::new(server.uri());
        let response = provider.current_weather(&request()).await.unwrap();

        let current = response.current.unwrap();
        assert_eq!(current.temperature_2m, Some(38.1));
        assert_eq!(current.wind_speed_10m, Some(11.2));
        assert_eq!(response.current_units.unwrap().temperature_2m.as_deref(), Some("°F"));
    }

    #[tokio::test]
    async fn error_status_is_reported_with_body() {
        let server = MockServer::start().await;
        Mock::given(path("/forecast"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"error": true, "reason": "Cannot initialize WeatherVariable"})),
            )
            .mount(&server)
            .await;

        let err = OpenMeteoProvider::new(server.uri())
            .current_weather(&request())
            .await
            .unwrap_err();

        match err {
            FetchError::Status { status, body } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert!(body.contains("Cannot initialize"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unexpected_shape_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(path("/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"latitude": "north"})))
            .mount(&server)
            .await;

        let err = OpenMeteoProvider::new(server.uri())
            .current_weather(&request())
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[tokio::test]
    async fn unreachable_provider_is_a_network_error() {
        // Nothing listens on the discard port.
        let provider = OpenMeteoProvider::new("http://127.0.0.1:9");

        let err = provider.current_weather(&request()).await.unwrap_err();

        assert!(matches!(err, FetchError::Network(_)));
    }
}
