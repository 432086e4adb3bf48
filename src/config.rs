use serde::Deserialize;
use thiserror::Error;

pub const ENV_INSTRUMENTATION_KEY: &str = "INSIGHTS_INSTRUMENTATION_KEY";
pub const ENV_DISABLE_TELEMETRY: &str = "INSIGHTS_DISABLE_TELEMETRY";
pub const ENV_ENDPOINT: &str = "INSIGHTS_ENDPOINT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("instrumentation key is missing (set {})", ENV_INSTRUMENTATION_KEY)]
    MissingKey,

    #[error("invalid value for {name}: {value:?}")]
    InvalidFlag { name: &'static str, value: String },

    #[error("could not parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Settings handed to `TelemetryFacade::initialize`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    pub instrumentation_key: String,
    #[serde(default)]
    pub disable_by_default: bool,
    /// Ingestion endpoint. Without one, telemetry is only recorded locally.
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl Config {
    pub fn new(instrumentation_key: impl Into<String>) -> Self {
        Self {
            instrumentation_key: instrumentation_key.into(),
            disable_by_default: false,
            endpoint: None,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let instrumentation_key = std::env::var(ENV_INSTRUMENTATION_KEY)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingKey)?;

        let disable_by_default = match std::env::var(ENV_DISABLE_TELEMETRY) {
            Ok(value) => parse_flag(ENV_DISABLE_TELEMETRY, &value)?,
            Err(_) => false,
        };

        Ok(Self {
            instrumentation_key,
            disable_by_default,
            endpoint: std::env::var(ENV_ENDPOINT).ok().filter(|e| !e.is_empty()),
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        if config.instrumentation_key.trim().is_empty() {
            return Err(ConfigError::MissingKey);
        }
        Ok(config)
    }
}

fn parse_flag(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" | "" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            name,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_toml() {
        let config = Config::from_toml_str(
            r#"
            instrumentation_key = "abc-123"
            disable_by_default = true
            endpoint = "https://ingest.example.com"
            "#,
        )
        .unwrap();

        assert_eq!(config.instrumentation_key, "abc-123");
        assert!(config.disable_by_default);
        assert_eq!(config.endpoint.as_deref(), Some("https://ingest.example.com"));
    }

    #[test]
    fn toml_defaults_optional_fields() {
        let config = Config::from_toml_str(r#"instrumentation_key = "abc""#).unwrap();
        assert_eq!(config, Config::new("abc"));
    }

    #[test]
    fn blank_key_is_rejected() {
        let err = Config::from_toml_str(r#"instrumentation_key = "  ""#).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey));
    }

    #[test]
    fn flags_accept_common_spellings() {
        assert!(parse_flag("X", "TRUE").unwrap());
        assert!(parse_flag("X", "1").unwrap());
        assert!(!parse_flag("X", "false").unwrap());
        assert!(matches!(parse_flag("X", "maybe"), Err(ConfigError::InvalidFlag { .. })));
    }
}
