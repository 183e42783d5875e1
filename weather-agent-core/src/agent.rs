//! The LLM pipeline: classify, build a request, fetch, answer.
//!
//! Each step is its own type so callers (and tests) can drive them one at a
//! time; [`WeatherAgent`] strings them together for a single query.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::{
    geo::{Geolocator, LocationHint},
    llm::{CallSettings, ChatModel},
    prompts::Prompts,
    provider::WeatherProvider,
};

pub mod answer;
pub mod classify;
pub mod request;

#[cfg(test)]
pub(crate) mod fakes;

pub use answer::AnswerGenerator;
pub use classify::{Classification, QueryClassifier};
pub use request::RequestGenerator;

/// Reply for queries that are not about the weather.
pub const NOT_WEATHER_MESSAGE: &str = "I'm sorry, I can only answer questions about the weather. \
Please ask me about the current weather conditions.";

/// Model settings and prompts for every call the agent makes.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSettings {
    pub classification: CallSettings,
    pub parameter_extraction: CallSettings,
    pub request_building: CallSettings,
    pub answer_generation: CallSettings,
    pub prompts: Prompts,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentReply {
    Answer(String),
    NotWeather,
}

impl AgentReply {
    pub fn message(&self) -> &str {
        match self {
            AgentReply::Answer(answer) => answer,
            AgentReply::NotWeather => NOT_WEATHER_MESSAGE,
        }
    }

    pub fn into_message(self) -> String {
        match self {
            AgentReply::Answer(answer) => answer,
            AgentReply::NotWeather => NOT_WEATHER_MESSAGE.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WeatherAgent {
    classifier: QueryClassifier,
    generator: RequestGenerator,
    answerer: AnswerGenerator,
    provider: Arc<dyn WeatherProvider>,
}

impl WeatherAgent {
    pub fn new(
        model: Arc<dyn ChatModel>,
        geolocator: Arc<dyn Geolocator>,
        provider: Arc<dyn WeatherProvider>,
        settings: &AgentSettings,
    ) -> Self {
        Self {
            classifier: QueryClassifier::new(
                model.clone(),
                settings.classification.clone(),
                settings.prompts.weather_classification.clone(),
            ),
            generator: RequestGenerator::new(model.clone(), geolocator, settings),
            answerer: AnswerGenerator::new(
                model,
                settings.answer_generation.clone(),
                settings.prompts.weather_answer_generation.clone(),
            ),
            provider,
        }
    }

    /// Answer one query.
    ///
    /// Upstream weather failures keep their [`crate::FetchError`] in the
    /// error chain so callers can tell them apart from LLM failures.
    pub async fn ask(&self, query: &str, location: &LocationHint) -> Result<AgentReply> {
        if !self.classifier.classify(query).await {
            info!("query is not about the weather");
            return Ok(AgentReply::NotWeather);
        }

        let request = self.generator.generate(query, location).await?;
        info!(
            latitude = request.latitude,
            longitude = request.longitude,
            current = ?request.current.map(|c| c.selected()),
            "weather request generated"
        );

        let weather = self
            .provider
            .current_weather(&request)
            .await
            .context("Error fetching weather data")?;
        info!(timezone = %weather.timezone, "weather data fetched");

        let answer = self.answerer.answer(query, &weather).await?;
        Ok(AgentReply::Answer(answer))
    }
}

#[cfg(test)]
mod tests {
    use super::fakes::{FixedGeolocator, ScriptedModel, StaticProvider, sample_response, settings};
    use super::*;
    use crate::{FetchError, llm::LlmError};

    const PARAMETERS: &str = r#"{"temperature_2m": true}"#;
    const OPTIONS: &str = r#"{"elevation": null, "temperature_unit": "celsius", "wind_speed_unit": "kmh",
        "precipitation_unit": "mm", "timeformat": "iso8601", "timezone": "GMT", "models": null,
        "cell_selection": "land"}"#;

    fn agent(
        model: &Arc<ScriptedModel>,
        provider: &Arc<StaticProvider>,
    ) -> WeatherAgent {
        WeatherAgent::new(
            model.clone(),
            Arc::new(FixedGeolocator::at(52.52, 13.41)),
            provider.clone(),
            &settings(),
        )
    }

    #[tokio::test]
    async fn weather_query_runs_the_full_chain() {
        let model = ScriptedModel::replying([
            r#"{"is_weather_query": true}"#,
            PARAMETERS,
            OPTIONS,
            "It is 21.3°C in Berlin.",
        ]);
        let provider = StaticProvider::returning(sample_response());

        let reply = agent(&model, &provider)
            .ask("How warm is it?", &LocationHint::ClientIp(None))
            .await
            .unwrap();

        assert_eq!(reply, AgentReply::Answer("It is 21.3°C in Berlin.".to_string()));
        assert_eq!(model.requests().len(), 4);

        let sent = provider.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].latitude, 52.52);
        assert_eq!(sent[0].current.unwrap().selected(), vec!["temperature_2m"]);
    }

    #[tokio::test]
    async fn non_weather_query_is_refused_without_further_calls() {
        let model = ScriptedModel::replying([r#"{"is_weather_query": false}"#]);
        let provider = StaticProvider::returning(sample_response());

        let reply = agent(&model, &provider)
            .ask("Tell me a joke", &LocationHint::ClientIp(None))
            .await
            .unwrap();

        assert_eq!(reply, AgentReply::NotWeather);
        assert_eq!(reply.message(), NOT_WEATHER_MESSAGE);
        assert_eq!(model.requests().len(), 1);
        assert!(provider.requests().is_empty());
    }

    #[tokio::test]
    async fn classifier_failure_is_treated_as_refusal() {
        let model = ScriptedModel::new([Err(LlmError::EmptyResponse)]);
        let provider = StaticProvider::returning(sample_response());

        let reply = agent(&model, &provider)
            .ask("Is it raining?", &LocationHint::ClientIp(None))
            .await
            .unwrap();

        assert_eq!(reply, AgentReply::NotWeather);
    }

    #[tokio::test]
    async fn fetch_failure_keeps_its_kind() {
        let model =
            ScriptedModel::replying([r#"{"is_weather_query": true}"#, PARAMETERS, OPTIONS]);
        let provider = StaticProvider::failing();

        let err = agent(&model, &provider)
            .ask("Is it windy?", &LocationHint::ClientIp(None))
            .await
            .unwrap_err();

        assert!(err.downcast_ref::<FetchError>().is_some());
        assert_eq!(err.to_string(), "Error fetching weather data");
    }

    #[tokio::test]
    async fn answer_failure_surfaces_with_context() {
        let model = ScriptedModel::new([
            Ok(r#"{"is_weather_query": true}"#.to_string()),
            Ok(PARAMETERS.to_string()),
            Ok(OPTIONS.to_string()),
            Err(LlmError::EmptyResponse),
        ]);
        let provider = StaticProvider::returning(sample_response());

        let err = agent(&model, &provider)
            .ask("Is it sunny?", &LocationHint::ClientIp(None))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Error generating weather answer");
    }
}
