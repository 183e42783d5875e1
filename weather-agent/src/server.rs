//! Inbound HTTP API.

use std::{
    convert::Infallible,
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use anyhow::Context;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{ConnectInfo, FromRequestParts, Query, State},
    http::{StatusCode, Uri, request::Parts},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{error, info};
use weather_agent_core::{
    FetchError, LocationHint, WeatherAgent, WeatherParameterSet, WeatherProvider, WeatherRequest,
    WeatherResponse,
    model::{
        CellSelection, PrecipitationUnit, TemperatureUnit, TimeFormat, UnknownName, WindSpeedUnit,
    },
};

/// Shared, read-only dependencies of the handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub agent: Arc<WeatherAgent>,
    pub provider: Arc<dyn WeatherProvider>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/simple_weather_agent", post(simple_weather_agent))
        .route("/weather/current", get(current_weather).post(current_weather_post))
        .with_state(state)
}

/// Serve until Ctrl-C.
pub async fn serve(state: AppState, bind: &str) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    info!(address = %listener.local_addr()?, "weather agent API listening");

    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("HTTP server failed")
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutting down"),
        Err(err) => error!(error = %err, "failed to listen for Ctrl-C"),
    }
}

/// Handler error, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    /// The weather provider failed.
    BadGateway(String),
    Internal(String),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        let message = format!("{err:#}");
        if err.downcast_ref::<FetchError>().is_some() {
            ApiError::BadGateway(message)
        } else {
            ApiError::Internal(message)
        }
    }
}

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        anyhow::Error::from(err).into()
    }
}

impl From<UnknownName> for ApiError {
    fn from(err: UnknownName) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::BadGateway(message) => (StatusCode::BAD_GATEWAY, message),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        if status.is_server_error() {
            error!(%status, error = %message, "request failed");
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Caller address: first `X-Forwarded-For` hop, else the socket peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub Option<IpAddr>);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .and_then(|first| first.trim().parse().ok());
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        Ok(ClientIp(forwarded.or(peer)))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct AgentRequest {
    pub query: String,
    /// Place name to use instead of the caller's IP location.
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AgentResponse {
    pub message: String,
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Welcome to Simple Weather Agent API",
        "health": "/health",
    }))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        message: "Weather Agents API is running".to_string(),
    })
}

async fn simple_weather_agent(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    Json(body): Json<AgentRequest>,
) -> Result<Json<AgentResponse>, ApiError> {
    info!(query = %body.query, location = ?body.location, ?client_ip, "agent query received");

    let location = LocationHint::from_parts(body.location.as_deref(), client_ip);
    let reply = state.agent.ask(&body.query, &location).await?;

    Ok(Json(AgentResponse {
        message: reply.into_message(),
    }))
}

/// `/weather/current` query string: request fields, lists comma-separated.
#[derive(Debug, Deserialize)]
pub struct CurrentQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: Option<f64>,
    pub current: Option<String>,
    #[serde(default)]
    pub temperature_unit: TemperatureUnit,
    #[serde(default)]
    pub wind_speed_unit: WindSpeedUnit,
    #[serde(default)]
    pub precipitation_unit: PrecipitationUnit,
    #[serde(default)]
    pub timeformat: TimeFormat,
    pub timezone: Option<String>,
    pub models: Option<String>,
    #[serde(default)]
    pub cell_selection: CellSelection,
}

impl TryFrom<CurrentQuery> for WeatherRequest {
    type Error = UnknownName;

    fn try_from(query: CurrentQuery) -> Result<Self, Self::Error> {
        let mut request = WeatherRequest::new(query.latitude, query.longitude);
        request.elevation = query.elevation;
        request.current = query
            .current
            .as_deref()
            .map(|names| WeatherParameterSet::from_names(names.split(',')))
            .transpose()?;
        request.temperature_unit = query.temperature_unit;
        request.wind_speed_unit = query.wind_speed_unit;
        request.precipitation_unit = query.precipitation_unit;
        request.timeformat = query.timeformat;
        if let Some(timezone) = query.timezone {
            request.timezone = timezone;
        }
        request.models = query.models.map(|models| {
            models
                .split(',')
                .map(str::trim)
                .filter(|model| !model.is_empty())
                .map(str::to_string)
                .collect()
        });
        request.cell_selection = query.cell_selection;
        Ok(request)
    }
}

async fn current_weather(
    State(state): State<AppState>,
    Query(query): Query<CurrentQuery>,
) -> Result<Json<WeatherResponse>, ApiError> {
    let request = WeatherRequest::try_from(query)?;
    let response = state.provider.current_weather(&request).await?;
    Ok(Json(response))
}

/// POST takes a JSON `WeatherRequest` body, or the same query string as GET
/// when the body is empty.
async fn current_weather_post(
    State(state): State<AppState>,
    uri: Uri,
    body: Bytes,
) -> Result<Json<WeatherResponse>, ApiError> {
    let request: WeatherRequest = if body.is_empty() {
        let Query(query) = Query::<CurrentQuery>::try_from_uri(&uri)
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
        query.try_into()?
    } else {
        serde_json::from_slice(&body)
            .map_err(|err| ApiError::BadRequest(format!("invalid request body: {err}")))?
    };

    let response = state.provider.current_weather(&request).await?;
    Ok(Json(response))
}
