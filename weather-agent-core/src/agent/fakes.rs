//! Hand-written collaborators for pipeline tests.

use std::{
    collections::VecDeque,
    net::IpAddr,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;

use crate::{
    FetchError, WeatherRequest, WeatherResponse,
    config::Config,
    geo::{Coordinates, GeoError, Geolocator},
    llm::{ChatModel, ChatRequest, LlmError},
    provider::WeatherProvider,
};

use super::AgentSettings;

pub fn settings() -> AgentSettings {
    Config::default().agent_settings()
}

/// Replies from a queue and records every request it sees.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedModel {
    pub fn new<I>(replies: I) -> Arc<Self>
    where
        I: IntoIterator<Item = Result<String, LlmError>>,
    {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn replying<const N: usize>(contents: [&str; N]) -> Arc<Self> {
        Self::new(contents.map(|c| Ok::<_, LlmError>(c.to_string())))
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(LlmError::EmptyResponse))
    }
}

/// Always answers with the same coordinates, except for the place "Atlantis".
#[derive(Debug)]
pub struct FixedGeolocator {
    coordinates: Coordinates,
    pub places: Mutex<Vec<String>>,
    pub ips: Mutex<Vec<Option<IpAddr>>>,
}

impl FixedGeolocator {
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self {
            coordinates: Coordinates { latitude, longitude },
            places: Mutex::new(Vec::new()),
            ips: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Geolocator for FixedGeolocator {
    async fn locate_ip(&self, ip: Option<IpAddr>) -> Result<Coordinates, GeoError> {
        self.ips.lock().unwrap().push(ip);
        Ok(self.coordinates)
    }

    async fn geocode(&self, place: &str) -> Result<Coordinates, GeoError> {
        self.places.lock().unwrap().push(place.to_string());
        if place == "Atlantis" {
            return Err(GeoError::PlaceNotFound(place.to_string()));
        }
        Ok(self.coordinates)
    }
}

#[derive(Debug)]
pub struct StaticProvider {
    response: Option<WeatherResponse>,
    requests: Mutex<Vec<WeatherRequest>>,
}

impl StaticProvider {
    pub fn returning(response: WeatherResponse) -> Arc<Self> {
        Arc::new(Self {
            response: Some(response),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            response: None,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<WeatherRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl WeatherProvider for StaticProvider {
    async fn current_weather(&self, request: &WeatherRequest) -> Result<WeatherResponse, FetchError> {
        self.requests.lock().unwrap().push(request.clone());
        self.response.clone().ok_or_else(|| FetchError::Status {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: "upstream down".to_string(),
        })
    }
}

pub fn sample_response() -> WeatherResponse {
    serde_json::from_value(json!({
        "latitude": 52.52,
        "longitude": 13.419998,
        "generationtime_ms": 0.05,
        "utc_offset_seconds": 3600,
        "timezone": "Europe/Berlin",
        "timezone_abbreviation": "CET",
        "elevation": 38.0,
        "current_units": {"time": "iso8601", "interval": "seconds", "temperature_2m": "°C"},
        "current": {"time": "2024-01-01T12:00", "interval": 900, "temperature_2m": 21.3}
    }))
    .unwrap()
}
