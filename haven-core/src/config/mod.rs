//! Configuration management for haven.
//!
//! This module provides a unified configuration system that separates
//! secrets (from environment variables) from settings (from TOML files).
//!
//! # Configuration Sources
//!
//! ## Secrets (Environment Variables)
//! - `GEMINI_API_KEY` - Gemini API key for direct client calls
//! - `QWEN_API_KEY` - upstream key, read only by the gateway server
//!
//! ## Settings (TOML File)
//! Located at `~/.config/haven/config.toml`:
//! ```toml
//! [gateway]
//! host = "127.0.0.1"
//! port = 3000
//!
//! [client]
//! backend = "relay"
//!
//! [resilience]
//! max_attempts = 3
//! base_delay_ms = 1000
//! ```

mod secrets;
mod settings;

pub use secrets::{GEMINI_API_KEY_ENV, QWEN_API_KEY_ENV, Secrets};
pub use settings::{
    Backend, ClientSettings, DeadlineMode, DiarySettings, GatewaySettings, LoggingSettings,
    PromptSettings, ResilienceSettings, Settings, SettingsError,
};

/// Combined configuration containing both secrets and settings.
#[derive(Debug, Clone)]
pub struct Config {
    /// Secrets loaded from environment variables
    pub secrets: Secrets,
    /// Settings loaded from TOML configuration file
    pub settings: Settings,
}

/// Errors that can occur when loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Secrets never fail to load; settings are validated for values the
    /// resilience layer cannot work with.
    pub fn load() -> Result<Self, ConfigError> {
        let secrets = Secrets::from_env();
        let settings = Settings::load()?;
        Self::from_parts(secrets, settings)
    }

    /// Build and validate a configuration from already-loaded parts.
    pub fn from_parts(secrets: Secrets, settings: Settings) -> Result<Self, ConfigError> {
        if settings.resilience.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "resilience.max_attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        if settings.resilience.deadline_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "resilience.deadline_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if settings.gateway.timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                key: "gateway.timeout_seconds",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Self { secrets, settings })
    }

    /// Get the HTTP bind address.
    pub fn bind_addr(&self) -> String {
        self.settings.bind_addr()
    }

    /// Get the Gemini API key (if configured).
    pub fn gemini_api_key(&self) -> Option<&str> {
        self.secrets.gemini_api_key.as_deref()
    }

    /// Get the gateway upstream API key (if configured).
    pub fn qwen_api_key(&self) -> Option<&str> {
        self.secrets.qwen_api_key.as_deref()
    }
}

/// Load .env file if it exists (for development convenience).
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    use secrets::tests::{ENV_MUTEX, clear_env};

    #[test]
    fn test_from_parts_accepts_defaults() {
        let config = Config::from_parts(Secrets::default(), Settings::default()).unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:3000");
        assert!(config.gemini_api_key().is_none());
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut settings = Settings::default();
        settings.resilience.max_attempts = 0;

        let err = Config::from_parts(Secrets::default(), settings).unwrap_err();
        assert!(err.to_string().contains("resilience.max_attempts"));
    }

    #[test]
    fn test_zero_gateway_timeout_rejected() {
        let mut settings = Settings::default();
        settings.gateway.timeout_seconds = 0;

        assert!(matches!(
            Config::from_parts(Secrets::default(), settings),
            Err(ConfigError::Invalid {
                key: "gateway.timeout_seconds",
                ..
            })
        ));
    }

    #[test]
    fn test_secret_accessors() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe {
            env::set_var(GEMINI_API_KEY_ENV, "g-key");
            env::set_var(QWEN_API_KEY_ENV, "q-key");
        }

        let config = Config::from_parts(Secrets::from_env_inner(), Settings::default()).unwrap();
        assert_eq!(config.gemini_api_key(), Some("g-key"));
        assert_eq!(config.qwen_api_key(), Some("q-key"));
        clear_env();
    }
}
