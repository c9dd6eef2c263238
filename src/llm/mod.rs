pub mod chat;
pub mod rate_limit;

use crate::cli::Args;
use crate::error::ConfigError;
use std::time::Duration;
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "https://api.deepseek.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "deepseek-chat";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 1000;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub request_timeout: Duration,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl CompletionConfig {
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let config = Self {
            endpoint: args.endpoint.clone(),
            model: args.model.clone(),
            temperature: args.temperature,
            max_tokens: args.max_tokens,
            request_timeout: Duration::from_secs(args.request_timeout_secs),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.endpoint).map_err(|e| ConfigError::InvalidEndpoint {
            url: self.endpoint.clone(),
            reason: e.to_string(),
        })?;
        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(ConfigError::InvalidEndpoint {
                url: self.endpoint.clone(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidSetting {
                name: "model",
                reason: "must not be empty".to_string(),
            });
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidSetting {
                name: "temperature",
                reason: format!("{} is outside 0.0..=2.0", self.temperature),
            });
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "max_tokens",
                reason: "must be positive".to_string(),
            });
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidSetting {
                name: "request_timeout",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = CompletionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_tokens, 1000);
        assert_eq!(config.model, "deepseek-chat");
    }

    #[test]
    fn test_rejects_non_http_endpoint() {
        let config = CompletionConfig {
            endpoint: "ftp://example.com/chat".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidEndpoint { .. })));

        let config = CompletionConfig {
            endpoint: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidEndpoint { .. })));
    }

    #[test]
    fn test_rejects_out_of_range_settings() {
        let config = CompletionConfig {
            temperature: 3.5,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidSetting { name: "temperature", .. })));

        let config = CompletionConfig {
            request_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidSetting { name: "request_timeout", .. })));
    }
}
