use async_trait::async_trait;
use reqwest::StatusCode;
use std::fmt::Debug;

use crate::{WeatherRequest, WeatherResponse};

pub mod openmeteo;

pub use openmeteo::OpenMeteoProvider;

/// Why a weather fetch failed.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The provider answered with a non-success status.
    #[error("weather provider returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// The provider could not be reached or the body could not be read.
    #[error("failed to reach weather provider")]
    Network(#[source] reqwest::Error),

    /// The body did not match the expected response shape.
    #[error("unexpected weather provider response")]
    Decode(#[source] serde_json::Error),
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current_weather(&self, request: &WeatherRequest) -> Result<WeatherResponse, FetchError>;
}

/// Shorten an upstream body for error messages.
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let cut = (0..=MAX).rev().find(|i| body.is_char_boundary(*i)).unwrap_or(0);
        format!("{}...", &body[..cut])
    } else {
        body.to_string()
    }
}
