use std::sync::Arc;

use anyhow::{Context, Result};
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    llm::{CallSettings, ChatModel, ResponseFormat},
    schema::schema_for,
};

/// Structured output of the classification call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
pub struct Classification {
    /// Whether the user asks about the current weather.
    #[serde(default)]
    pub is_weather_query: bool,
}

/// Response format used when the config does not set one.
pub fn classification_format() -> ResponseFormat {
    ResponseFormat::strict_json_schema("weather_classification", &schema_for::<Classification>())
}

/// Decides whether a query is about the weather.
#[derive(Debug, Clone)]
pub struct QueryClassifier {
    model: Arc<dyn ChatModel>,
    settings: CallSettings,
    prompt: String,
}

impl QueryClassifier {
    pub fn new(model: Arc<dyn ChatModel>, settings: CallSettings, prompt: impl Into<String>) -> Self {
        Self {
            model,
            settings,
            prompt: prompt.into(),
        }
    }

    /// Never fails: any LLM or parse error counts as "not about the weather".
    pub async fn classify(&self, query: &str) -> bool {
        match self.try_classify(query).await {
            Ok(is_weather) => {
                debug!(is_weather, "query classified");
                is_weather
            }
            Err(err) => {
                warn!(error = %format!("{err:#}"), "error classifying query, treating it as not weather related");
                false
            }
        }
    }

    async fn try_classify(&self, query: &str) -> Result<bool> {
        let format = self
            .settings
            .response_format
            .clone()
            .unwrap_or_else(classification_format);
        let request = self.settings.request(&self.prompt, query, Some(format));

        let content = self
            .model
            .complete(&request)
            .await
            .context("classification call failed")?;
        let classification: Classification =
            serde_json::from_str(&content).context("classification output is not a JSON object")?;

        Ok(classification.is_weather_query)
    }
}
