use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Text, required};
use tracing::info;
use weather_agent_core::{
    ChatModel, Config, Geolocator, HttpGeolocator, LocationHint, OpenAiClient, OpenMeteoProvider,
    WeatherAgent, WeatherParameterSet, WeatherProvider, WeatherRequest,
    model::{PrecipitationUnit, TemperatureUnit, WindSpeedUnit},
};

use crate::{output, server};

/// Parameters `current` asks for when none are given.
const DEFAULT_CURRENT_PARAMS: [&str; 6] = [
    "temperature_2m",
    "apparent_temperature",
    "relative_humidity_2m",
    "precipitation",
    "weather_code",
    "wind_speed_10m",
];

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-agent", version, about = "Answers weather questions with an LLM and Open-Meteo")]
pub struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP API.
    Serve {
        /// Address to listen on, e.g. 0.0.0.0:8000.
        #[arg(long)]
        bind: Option<String>,
    },

    /// Ask the agent a single question.
    Ask {
        query: String,

        /// Place to use instead of this machine's IP location.
        #[arg(long)]
        location: Option<String>,
    },

    /// Show current conditions for coordinates, without the LLM.
    Current {
        #[arg(long, allow_negative_numbers = true)]
        latitude: f64,

        #[arg(long, allow_negative_numbers = true)]
        longitude: f64,

        /// Weather parameter to fetch; repeat for more.
        #[arg(long = "param", value_name = "NAME")]
        params: Vec<String>,

        #[arg(long, default_value_t)]
        temperature_unit: TemperatureUnit,

        #[arg(long, default_value_t)]
        wind_speed_unit: WindSpeedUnit,

        #[arg(long, default_value_t)]
        precipitation_unit: PrecipitationUnit,

        /// Time zone name, or "auto" to use the location's.
        #[arg(long)]
        timezone: Option<String>,
    },

    /// Store the OpenAI API key and default model.
    Configure,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let mut config = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };

        match self.command {
            Command::Serve { bind } => {
                let bind = bind.unwrap_or_else(|| config.server.bind.clone());
                let (agent, provider) = build(&config)?;
                server::serve(server::AppState { agent: Arc::new(agent), provider }, &bind).await?;
            }
            Command::Ask { query, location } => {
                let (agent, _) = build(&config)?;
                let hint = LocationHint::from_parts(location.as_deref(), None);
                let reply = agent.ask(&query, &hint).await?;
                println!("{}", reply.message());
            }
            Command::Current {
                latitude,
                longitude,
                params,
                temperature_unit,
                wind_speed_unit,
                precipitation_unit,
                timezone,
            } => {
                let current = if params.is_empty() {
                    WeatherParameterSet::from_names(DEFAULT_CURRENT_PARAMS)?
                } else {
                    WeatherParameterSet::from_names(&params)?
                };

                let mut request = WeatherRequest::new(latitude, longitude).with_current(current);
                request.temperature_unit = temperature_unit;
                request.wind_speed_unit = wind_speed_unit;
                request.precipitation_unit = precipitation_unit;
                if let Some(timezone) = timezone {
                    request.timezone = timezone;
                }

                let provider = OpenMeteoProvider::new(&config.endpoints.open_meteo);
                let response = provider.current_weather(&request).await?;
                print!("{}", output::current_conditions(&response));
            }
            Command::Configure => configure(&mut config, self.config)?,
        }

        Ok(())
    }
}

/// Wire the production clients from config.
fn build(config: &Config) -> anyhow::Result<(WeatherAgent, Arc<dyn WeatherProvider>)> {
    let model: Arc<dyn ChatModel> =
        Arc::new(OpenAiClient::with_base_url(config.api_key()?, &config.openai.base_url));
    let geolocator: Arc<dyn Geolocator> = Arc::new(HttpGeolocator::new(
        &config.endpoints.ipify,
        &config.endpoints.ipapi,
        &config.endpoints.geocoding,
    ));
    let provider: Arc<dyn WeatherProvider> =
        Arc::new(OpenMeteoProvider::new(&config.endpoints.open_meteo));

    let agent = WeatherAgent::new(model, geolocator, provider.clone(), &config.agent_settings());
    Ok((agent, provider))
}

fn configure(config: &mut Config, path: Option<PathBuf>) -> anyhow::Result<()> {
    let api_key = Password::new("OpenAI API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .with_validator(required!("API key cannot be empty"))
        .prompt()
        .context("Failed to read API key")?;

    let current_model = config.openai.weather_answer_generation.model.clone();
    let model = Text::new("Model:")
        .with_default(&current_model)
        .prompt()
        .context("Failed to read model name")?;

    config.set_api_key(api_key.trim().to_string());
    config.set_model(model.trim());

    let path = match path {
        Some(path) => {
            config.save_to(&path)?;
            path
        }
        None => config.save()?,
    };

    info!(path = %path.display(), "configuration saved");
    println!("Configuration saved to {}", path.display());
    Ok(())
}
