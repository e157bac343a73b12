use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::service::llm::ProviderKind;

const ENV_CONFIG_PATH: &str = "SOURCELENS_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "config.yaml";

const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-latest";
const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_MAX_TOKENS: u64 = 2048;
const DEFAULT_TEMPERATURE: f64 = 0.7;
const DEFAULT_MAX_SOURCE_CHARS: usize = 60_000;

/// LLM provider selection and generation settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Model used when a request names only the "gpt" flag or an unknown id routes to OpenAI
    pub openai_model: String,
    pub anthropic_model: String,
    pub gemini_model: String,
    /// Provider used for model ids that match no known prefix
    pub default_provider: ProviderKind,
    pub max_tokens: u64,
    pub temperature: f64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            anthropic_model: DEFAULT_ANTHROPIC_MODEL.to_string(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            default_provider: ProviderKind::Anthropic,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl ProviderSettings {
    pub fn default_model_for(&self, kind: ProviderKind) -> &str {
        match kind {
            ProviderKind::OpenAi => &self.openai_model,
            ProviderKind::Anthropic => &self.anthropic_model,
            ProviderKind::Gemini => &self.gemini_model,
        }
    }
}

/// Analysis prompt settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Sources longer than this are truncated before prompting
    pub max_source_chars: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            max_source_chars: DEFAULT_MAX_SOURCE_CHARS,
        }
    }
}

/// YAML configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub providers: ProviderSettings,
    #[serde(default)]
    pub analysis: AnalysisSettings,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub providers: ProviderSettings,
    pub analysis: AnalysisSettings,
    pub port: u16,
    pub host: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            providers: ProviderSettings::default(),
            analysis: AnalysisSettings::default(),
            port: 8080,
            host: "127.0.0.1".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment and config file
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let config_path =
            std::env::var(ENV_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let file = Self::load_config_file(&config_path).unwrap_or_default();

        Self {
            providers: file.providers,
            analysis: file.analysis,
            port,
            host,
        }
    }

    /// Load configuration from YAML file
    fn load_config_file(path: &str) -> Option<ConfigFile> {
        let path = Path::new(path);

        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return None;
        }

        match fs::read_to_string(path) {
            Ok(contents) => {
                let contents = contents.trim();
                if contents.is_empty() {
                    tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
                    return Some(ConfigFile::default());
                }

                match serde_yaml::from_str(contents) {
                    Ok(config) => {
                        tracing::info!(path = %path.display(), "Loaded configuration from file");
                        Some(config)
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Failed to parse config file, using defaults");
                        None
                    }
                }
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read config file, using defaults");
                None
            }
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
providers:
  openai_model: gpt-4o
  default_provider: openai
analysis:
  max_source_chars: 1000
"#;
        let file: ConfigFile = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(file.providers.openai_model, "gpt-4o");
        assert_eq!(file.providers.anthropic_model, DEFAULT_ANTHROPIC_MODEL);
        assert_eq!(file.providers.default_provider, ProviderKind::OpenAi);
        assert_eq!(file.analysis.max_source_chars, 1000);
    }

    #[test]
    fn test_missing_file_yields_none() {
        assert!(Config::load_config_file("/nonexistent/sourcelens.yaml").is_none());
    }

    #[test]
    fn test_invalid_file_yields_none() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "providers: [not, a, map]").unwrap();

        assert!(Config::load_config_file(file.path().to_str().unwrap()).is_none());
    }

    #[test]
    fn test_empty_file_yields_defaults() {
        let file = tempfile::NamedTempFile::new().unwrap();

        let loaded = Config::load_config_file(file.path().to_str().unwrap()).unwrap();

        assert_eq!(loaded.analysis.max_source_chars, DEFAULT_MAX_SOURCE_CHARS);
    }
}
