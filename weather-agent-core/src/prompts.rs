//! System prompts for the four LLM calls.
//!
//! The extraction and request-building prompts may contain
//! [`PARAMETERS_PLACEHOLDER`], which is replaced with the parameter inventory
//! produced by [`crate::describe`] before the prompt is sent.

use serde::{Deserialize, Serialize};

pub const PARAMETERS_PLACEHOLDER: &str = "{parameters}";

const WEATHER_CLASSIFICATION: &str = "You decide whether a user message asks about the \
current weather conditions. Questions about temperature, rain, wind, humidity, clouds, \
snow, sunshine or what to wear for the weather right now count as weather queries. \
Anything else, including forecasts for future days and historical climate data, does not. \
Reply with a JSON object of the form {\"is_weather_query\": true} or \
{\"is_weather_query\": false}.";

const WEATHER_PARAMETER_EXTRACTION: &str = "You select the Open-Meteo current weather \
variables needed to answer the user's question. Switch on only the variables that are \
relevant; leave every other variable false. When the question is general (for example \
\"what's the weather like?\"), select temperature_2m, apparent_temperature, \
relative_humidity_2m, precipitation, cloud_cover, wind_speed_10m and weather_code.\n\n\
Available variables:\n{parameters}";

const WEATHER_REQUEST_BUILDING: &str = "You fill in the request options for an Open-Meteo \
current weather request based on the user's question. Only change an option from its \
default when the user asks for it, for example fahrenheit when they mention Fahrenheit or \
mph for miles per hour. Use null for elevation and models unless the user names them, and \
keep the timezone at GMT unless a timezone is requested.\n\n\
Available options:\n{parameters}";

const WEATHER_ANSWER_GENERATION: &str = "You are a friendly weather assistant. Answer the \
user's question using only the weather data provided. Mention the values with their units, \
keep the answer to a few sentences, and say so plainly when the data does not contain what \
the user asked for.";

/// Prompt texts, overridable from the `[prompts]` config section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Prompts {
    pub weather_classification: String,
    pub weather_parameter_extraction: String,
    pub weather_request_building: String,
    pub weather_answer_generation: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            weather_classification: WEATHER_CLASSIFICATION.to_string(),
            weather_parameter_extraction: WEATHER_PARAMETER_EXTRACTION.to_string(),
            weather_request_building: WEATHER_REQUEST_BUILDING.to_string(),
            weather_answer_generation: WEATHER_ANSWER_GENERATION.to_string(),
        }
    }
}

/// Substitute the parameter inventory into a prompt template.
pub fn render(template: &str, parameters: &str) -> String {
    template.replace(PARAMETERS_PLACEHOLDER, parameters)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_prompts_carry_the_placeholder() {
        let prompts = Prompts::default();

        assert!(prompts.weather_parameter_extraction.contains(PARAMETERS_PLACEHOLDER));
        assert!(prompts.weather_request_building.contains(PARAMETERS_PLACEHOLDER));
        assert!(!prompts.weather_classification.contains(PARAMETERS_PLACEHOLDER));
    }

    #[test]
    fn render_replaces_placeholder() {
        let out = render("Options:\n{parameters}", "timezone: Time zone");

        assert_eq!(out, "Options:\ntimezone: Time zone");
    }

    #[test]
    fn render_leaves_templates_without_placeholder_alone() {
        assert_eq!(render("plain", "ignored"), "plain");
    }
}
