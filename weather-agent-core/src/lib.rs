//! Core library for the `weather-agent` binary.
//!
//! This crate defines:
//! - Shared domain models (requests, responses, the parameter vocabulary)
//! - Strict JSON-schema generation and the prompt parameter describer
//! - Open-Meteo query building and the weather provider abstraction
//! - LLM and geolocation clients behind traits
//! - The classify / generate / fetch / answer pipeline
//! - Configuration handling
//!
//! It is used by `weather-agent`, but can also be reused by other binaries or services.

pub mod agent;
pub mod config;
pub mod describe;
pub mod geo;
pub mod llm;
pub mod model;
pub mod params;
pub mod prompts;
pub mod provider;
pub mod schema;

pub use agent::{AgentReply, AgentSettings, NOT_WEATHER_MESSAGE, WeatherAgent};
pub use config::{Config, ConfigError};
pub use geo::{Coordinates, GeoError, Geolocator, HttpGeolocator, LocationHint};
pub use llm::{ChatModel, LlmError, OpenAiClient};
pub use model::{WeatherParameterSet, WeatherRequest, WeatherResponse};
pub use params::build_query;
pub use provider::{FetchError, OpenMeteoProvider, WeatherProvider};
pub use schema::strictify;
