use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
};

use crate::{
    agent::AgentSettings,
    geo::{DEFAULT_GEOCODING_URL, DEFAULT_IPAPI_URL, DEFAULT_IPIFY_URL},
    llm::{CallSettings, DEFAULT_OPENAI_BASE_URL},
    prompts::Prompts,
    provider::openmeteo::DEFAULT_OPEN_METEO_URL,
};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BIND: &str = "127.0.0.1:8000";

/// Environment variable that takes precedence over `openai.api_key`.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine platform config directory")]
    NoConfigDir,

    #[error("failed to read config file: {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file: {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize configuration to TOML")]
    Serialize(#[source] toml::ser::Error),

    #[error("failed to write config file: {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(
        "no OpenAI API key configured.\n\
         Hint: set OPENAI_API_KEY or run `weather-agent configure` first."
    )]
    MissingApiKey,
}

/// Top-level configuration stored on disk.
///
/// Every section is optional; missing ones take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub openai: OpenAiConfig,
    pub prompts: Prompts,
    pub endpoints: Endpoints,
    pub server: ServerConfig,
}

/// Example TOML:
/// [openai]
/// api_key = "sk-..."
///
/// [openai.weather_classification]
/// model = "gpt-4o-mini"
/// max_tokens = 50
/// temperature = 0.0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub base_url: String,
    pub weather_classification: CallSettings,
    pub weather_parameter_extraction: CallSettings,
    pub weather_request_building: CallSettings,
    pub weather_answer_generation: CallSettings,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            weather_classification: CallSettings::new(DEFAULT_MODEL, 50, 0.0),
            weather_parameter_extraction: CallSettings::new(DEFAULT_MODEL, 1000, 0.0),
            weather_request_building: CallSettings::new(DEFAULT_MODEL, 500, 0.0),
            weather_answer_generation: CallSettings::new(DEFAULT_MODEL, 500, 0.7),
        }
    }
}

/// Base URLs of the outbound services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub open_meteo: String,
    pub geocoding: String,
    pub ipify: String,
    pub ipapi: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            open_meteo: DEFAULT_OPEN_METEO_URL.to_string(),
            geocoding: DEFAULT_GEOCODING_URL.to_string(),
            ipify: DEFAULT_IPIFY_URL.to_string(),
            ipapi: DEFAULT_IPAPI_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

impl Config {
    /// Load config from the platform config dir, or defaults if it doesn't exist yet.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_file_path()?)
    }

    /// Load config from `path`, or defaults if the file doesn't exist yet.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save config to the platform config dir.
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let toml = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        fs::write(path, toml).map_err(write_err)
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf, ConfigError> {
        let dirs = ProjectDirs::from("dev", "weather-agent", "weather-agent")
            .ok_or(ConfigError::NoConfigDir)?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// The OpenAI API key: `OPENAI_API_KEY` first, then the config file.
    pub fn api_key(&self) -> Result<String, ConfigError> {
        resolve_api_key(std::env::var(API_KEY_ENV).ok(), self.openai.api_key.as_deref())
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.openai.api_key = Some(api_key);
    }

    /// Set the model for every call at once.
    pub fn set_model(&mut self, model: &str) {
        for settings in [
            &mut self.openai.weather_classification,
            &mut self.openai.weather_parameter_extraction,
            &mut self.openai.weather_request_building,
            &mut self.openai.weather_answer_generation,
        ] {
            settings.model = model.to_string();
        }
    }

    pub fn agent_settings(&self) -> AgentSettings {
        AgentSettings {
            classification: self.openai.weather_classification.clone(),
            parameter_extraction: self.openai.weather_parameter_extraction.clone(),
            request_building: self.openai.weather_request_building.clone(),
            answer_generation: self.openai.weather_answer_generation.clone(),
            prompts: self.prompts.clone(),
        }
    }
}

fn resolve_api_key(from_env: Option<String>, from_file: Option<&str>) -> Result<String, ConfigError> {
    from_env
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .or_else(|| {
            from_file
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(str::to_string)
        })
        .ok_or(ConfigError::MissingApiKey)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ResponseFormat;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();

        let cfg = Config::load_from(&dir.path().join("config.toml")).unwrap();

        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.server.bind, "127.0.0.1:8000");
        assert_eq!(cfg.openai.weather_classification.model, DEFAULT_MODEL);
        assert_eq!(cfg.endpoints.open_meteo, DEFAULT_OPEN_METEO_URL);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.set_api_key("sk-test".into());
        cfg.set_model("gpt-4o");
        cfg.server.bind = "0.0.0.0:9000".into();
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, cfg);
        assert_eq!(loaded.openai.weather_answer_generation.model, "gpt-4o");
        assert_eq!(loaded.openai.weather_answer_generation.temperature, 0.7);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
            [openai.weather_classification]
            model = "gpt-4.1-nano"
            max_tokens = 20
            temperature = 0.0
            response_format = { type = "json_object" }

            [prompts]
            weather_answer_generation = "Be brief."
            "#,
        )
        .unwrap();

        let cfg = Config::load_from(&path).unwrap();

        assert_eq!(cfg.openai.weather_classification.model, "gpt-4.1-nano");
        assert_eq!(
            cfg.openai.weather_classification.response_format,
            Some(ResponseFormat::JsonObject)
        );
        assert_eq!(cfg.openai.weather_request_building.model, DEFAULT_MODEL);
        assert_eq!(cfg.prompts.weather_answer_generation, "Be brief.");
        assert_eq!(
            cfg.prompts.weather_classification,
            Prompts::default().weather_classification
        );
        assert_eq!(cfg.server, ServerConfig::default());
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[server\nbind = ").unwrap();

        let err = Config::load_from(&path).unwrap_err();

        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("failed to parse config file"));
    }

    #[test]
    fn wrong_value_type_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[server]\nbind = 8000\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();

        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn env_key_wins_over_file_key() {
        let key = resolve_api_key(Some("sk-env".into()), Some("sk-file")).unwrap();

        assert_eq!(key, "sk-env");
    }

    #[test]
    fn blank_keys_are_ignored() {
        assert_eq!(resolve_api_key(Some("  ".into()), Some("sk-file")).unwrap(), "sk-file");
        assert!(matches!(
            resolve_api_key(None, Some("")),
            Err(ConfigError::MissingApiKey)
        ));
    }

    #[test]
    fn agent_settings_follow_the_openai_sections() {
        let mut cfg = Config::default();
        cfg.openai.weather_request_building.max_tokens = 42;
        cfg.prompts.weather_classification = "classify".into();

        let settings = cfg.agent_settings();

        assert_eq!(settings.request_building.max_tokens, 42);
        assert_eq!(settings.prompts.weather_classification, "classify");
        assert_eq!(settings.answer_generation, cfg.openai.weather_answer_generation);
    }
}
