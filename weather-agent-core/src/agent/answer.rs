use std::sync::Arc;

use anyhow::{Context, Result};

use crate::{
    llm::{CallSettings, ChatModel},
    model::WeatherResponse,
};

/// Writes the final natural-language answer from fetched weather data.
#[derive(Debug, Clone)]
pub struct AnswerGenerator {
    model: Arc<dyn ChatModel>,
    settings: CallSettings,
    prompt: String,
}

impl AnswerGenerator {
    pub fn new(model: Arc<dyn ChatModel>, settings: CallSettings, prompt: impl Into<String>) -> Self {
        Self {
            model,
            settings,
            prompt: prompt.into(),
        }
    }

    pub async fn answer(&self, query: &str, weather: &WeatherResponse) -> Result<String> {
        self.try_answer(query, weather)
            .await
            .context("Error generating weather answer")
    }

    async fn try_answer(&self, query: &str, weather: &WeatherResponse) -> Result<String> {
        let data = serde_json::to_string_pretty(weather)?;
        let request = self
            .settings
            .request(&self.prompt, &user_message(query, &data), None);

        Ok(self.model.complete(&request).await?)
    }
}

fn user_message(query: &str, weather_data: &str) -> String {
    format!("User Query: {query}\n\nWeather Data:\n{weather_data}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        agent::fakes::{ScriptedModel, sample_response, settings},
        llm::LlmError,
    };

    fn generator(model: &Arc<ScriptedModel>) -> AnswerGenerator {
        let settings = settings();
        AnswerGenerator::new(
            model.clone(),
            settings.answer_generation,
            settings.prompts.weather_answer_generation,
        )
    }

    #[tokio::test]
    async fn embeds_query_and_pretty_weather_data() {
        let model = ScriptedModel::replying(["It's a mild 21.3°C."]);
        let weather = sample_response();

        let answer = generator(&model)
            .answer("How warm is it?", &weather)
            .await
            .unwrap();

        assert_eq!(answer, "It's a mild 21.3°C.");

        let requests = model.requests();
        let sent = &requests[0];
        let user = &sent.messages[1].content;
        assert!(user.starts_with("User Query: How warm is it?\n\nWeather Data:\n{\n"));
        assert!(user.contains("\"temperature_2m\": 21.3"));
        assert!(user.contains("\"timezone\": \"Europe/Berlin\""));
        assert_eq!(sent.response_format, None);
    }

    #[tokio::test]
    async fn failure_carries_context() {
        let model = ScriptedModel::new([Err(LlmError::EmptyResponse)]);

        let err = generator(&model)
            .answer("How warm is it?", &sample_response())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Error generating weather answer");
        assert!(format!("{err:#}").contains("no message content"));
    }
}
