use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::{
    describe::{
        GENERATED_ELSEWHERE, weather_parameters_description,
        weather_request_parameters_description,
    },
    geo::{Coordinates, Geolocator, LocationHint},
    llm::{CallSettings, ChatModel, ResponseFormat},
    model::{WeatherParameterSet, WeatherRequest},
    prompts::render,
    schema::{schema_for, without_properties},
};

use super::AgentSettings;

/// Turns a query into a complete [`WeatherRequest`].
///
/// One LLM call picks the parameters, a second one fills in the request
/// options, and the coordinates come from the [`Geolocator`].
#[derive(Debug, Clone)]
pub struct RequestGenerator {
    model: Arc<dyn ChatModel>,
    geolocator: Arc<dyn Geolocator>,
    extraction: CallSettings,
    building: CallSettings,
    extraction_prompt: String,
    building_prompt: String,
    parameters_format: ResponseFormat,
    options_format: ResponseFormat,
}

impl RequestGenerator {
    pub fn new(
        model: Arc<dyn ChatModel>,
        geolocator: Arc<dyn Geolocator>,
        settings: &AgentSettings,
    ) -> Self {
        let options_schema = without_properties(schema_for::<WeatherRequest>(), &GENERATED_ELSEWHERE);

        Self {
            model,
            geolocator,
            extraction: settings.parameter_extraction.clone(),
            building: settings.request_building.clone(),
            extraction_prompt: render(
                &settings.prompts.weather_parameter_extraction,
                &weather_parameters_description(),
            ),
            building_prompt: render(
                &settings.prompts.weather_request_building,
                &weather_request_parameters_description(),
            ),
            parameters_format: ResponseFormat::strict_json_schema(
                "weather_parameters",
                &schema_for::<WeatherParameterSet>(),
            ),
            options_format: ResponseFormat::strict_json_schema("weather_request", &options_schema),
        }
    }

    pub async fn generate(&self, query: &str, location: &LocationHint) -> Result<WeatherRequest> {
        self.try_generate(query, location)
            .await
            .context("Error generating weather request")
    }

    async fn try_generate(&self, query: &str, location: &LocationHint) -> Result<WeatherRequest> {
        let parameters = self.extract_parameters(query).await?;
        debug!(selected = ?parameters.selected(), "weather parameters extracted");

        let options = self.build_options(query).await?;

        let coordinates = self
            .geolocator
            .resolve(location)
            .await
            .context("failed to resolve location")?;
        info!(
            latitude = coordinates.latitude,
            longitude = coordinates.longitude,
            "location resolved"
        );

        assemble(options, parameters, coordinates)
    }

    async fn extract_parameters(&self, query: &str) -> Result<WeatherParameterSet> {
        let request = self.extraction.request(
            &self.extraction_prompt,
            query,
            Some(self.parameters_format.clone()),
        );
        let content = self
            .model
            .complete(&request)
            .await
            .context("parameter extraction call failed")?;

        serde_json::from_str(&content).context("parameter extraction output is not a parameter set")
    }

    async fn build_options(&self, query: &str) -> Result<Map<String, Value>> {
        let request = self.building.request(
            &self.building_prompt,
            query,
            Some(self.options_format.clone()),
        );
        let content = self
            .model
            .complete(&request)
            .await
            .context("request building call failed")?;

        serde_json::from_str(&content).context("request building output is not a JSON object")
    }
}

/// Merge the LLM's request options with the extracted parameters and coordinates.
fn assemble(
    mut options: Map<String, Value>,
    parameters: WeatherParameterSet,
    coordinates: Coordinates,
) -> Result<WeatherRequest> {
    options.insert("current".to_string(), serde_json::to_value(parameters)?);
    options.insert("latitude".to_string(), Value::from(coordinates.latitude));
    options.insert("longitude".to_string(), Value::from(coordinates.longitude));

    serde_json::from_value(Value::Object(options)).context("generated weather request is invalid")
}
