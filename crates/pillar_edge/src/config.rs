//! Edge server settings read from the environment.

use pillar_core::example_gen::DEFAULT_MODEL;
use pillar_core::logging::LoggingSettings;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;

pub const ADDR_ENV: &str = "PILLAR_EDGE_ADDR";
pub const IDENTITY_URL_ENV: &str = "PILLAR_IDENTITY_URL";
pub const IDENTITY_API_KEY_ENV: &str = "PILLAR_IDENTITY_API_KEY";
pub const GATEWAY_URL_ENV: &str = "PILLAR_AI_GATEWAY_URL";
pub const GATEWAY_KEY_ENV: &str = "PILLAR_AI_GATEWAY_KEY";
pub const MODEL_ENV: &str = "PILLAR_AI_MODEL";

const DEFAULT_ADDR: &str = "0.0.0.0:8787";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Required variable is unset or blank.
    Missing(&'static str),
    /// Listen address does not parse as `host:port`.
    InvalidAddr(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(key) => write!(f, "missing required environment variable {key}"),
            Self::InvalidAddr(value) => write!(f, "invalid {ADDR_ENV} `{value}`"),
        }
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeConfig {
    pub addr: SocketAddr,
    pub identity_url: String,
    pub identity_api_key: String,
    pub gateway_url: String,
    pub gateway_key: String,
    pub model: String,
    pub logging: LoggingSettings,
}

impl EdgeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let addr_text = get(ADDR_ENV).unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr: SocketAddr = addr_text
            .parse()
            .map_err(|_| ConfigError::InvalidAddr(addr_text.clone()))?;

        Ok(Self {
            addr,
            identity_url: require(IDENTITY_URL_ENV)?,
            identity_api_key: require(IDENTITY_API_KEY_ENV)?,
            gateway_url: require(GATEWAY_URL_ENV)?,
            gateway_key: require(GATEWAY_KEY_ENV)?,
            model: get(MODEL_ENV).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            logging: LoggingSettings::from_env(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, EdgeConfig};
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 4] = [
        ("PILLAR_IDENTITY_URL", "https://id.example.test"),
        ("PILLAR_IDENTITY_API_KEY", "anon"),
        ("PILLAR_AI_GATEWAY_URL", "https://ai.example.test/v1/chat/completions"),
        ("PILLAR_AI_GATEWAY_KEY", "key"),
    ];

    #[test]
    fn defaults_fill_optional_keys() {
        let config = EdgeConfig::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.addr.port(), 8787);
        assert_eq!(config.model, "google/gemini-2.5-flash");
    }

    #[test]
    fn blank_required_key_is_missing() {
        let mut pairs = REQUIRED.to_vec();
        pairs[1] = ("PILLAR_IDENTITY_API_KEY", "  ");
        let err = EdgeConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert_eq!(err, ConfigError::Missing("PILLAR_IDENTITY_API_KEY"));
    }

    #[test]
    fn bad_address_is_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PILLAR_EDGE_ADDR", "nowhere"));
        let err = EdgeConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert_eq!(err, ConfigError::InvalidAddr("nowhere".to_string()));
    }
}
