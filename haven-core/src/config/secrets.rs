//! Secrets configuration loaded from environment variables only.
//!
//! This module handles sensitive configuration like API keys that should
//! never be stored in files. All secrets are read from environment variables,
//! once, at process start. Components receive them as constructor arguments.

use std::env;

/// Environment variable holding the Gemini key used by direct clients.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Environment variable holding the upstream key used by the gateway.
pub const QWEN_API_KEY_ENV: &str = "QWEN_API_KEY";

/// Secrets loaded exclusively from environment variables.
///
/// Every secret is optional here: a missing credential is reported by the
/// component that needs it, at request time, not at startup.
#[derive(Clone, Default)]
pub struct Secrets {
    /// Gemini API key (env: GEMINI_API_KEY)
    pub gemini_api_key: Option<String>,

    /// DashScope/Qwen API key for the gateway upstream (env: QWEN_API_KEY)
    pub qwen_api_key: Option<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("gemini_api_key", &redact(&self.gemini_api_key))
            .field("qwen_api_key", &redact(&self.qwen_api_key))
            .finish()
    }
}

impl Secrets {
    /// Load secrets from environment variables.
    ///
    /// This function also loads .env file if present (for development),
    /// but production should rely on actual environment variables.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        Self::from_env_inner()
    }

    /// Internal method to load from environment without loading .env
    pub(crate) fn from_env_inner() -> Self {
        Self {
            gemini_api_key: read_secret(GEMINI_API_KEY_ENV),
            qwen_api_key: read_secret(QWEN_API_KEY_ENV),
        }
    }
}

fn redact(secret: &Option<String>) -> Option<&'static str> {
    secret.as_ref().map(|_| "***")
}

fn read_secret(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    // Tests that modify environment variables must not run concurrently
    pub(crate) static ENV_MUTEX: Mutex<()> = Mutex::new(());

    pub(crate) fn clear_env() {
        unsafe {
            env::remove_var(GEMINI_API_KEY_ENV);
            env::remove_var(QWEN_API_KEY_ENV);
        }
    }

    #[test]
    fn test_load_gemini_only() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe { env::set_var(GEMINI_API_KEY_ENV, "g-test") }

        let secrets = Secrets::from_env_inner();
        assert_eq!(secrets.gemini_api_key.as_deref(), Some("g-test"));
        assert!(secrets.qwen_api_key.is_none());
    }

    #[test]
    fn test_missing_secrets_are_not_an_error() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();

        let secrets = Secrets::from_env_inner();
        assert!(secrets.gemini_api_key.is_none());
        assert!(secrets.qwen_api_key.is_none());
    }

    #[test]
    fn test_blank_secret_is_treated_as_missing() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe { env::set_var(QWEN_API_KEY_ENV, "   ") }

        let secrets = Secrets::from_env_inner();
        assert!(secrets.qwen_api_key.is_none());
    }

    #[test]
    fn test_debug_redacts_keys() {
        let secrets = Secrets {
            gemini_api_key: Some("super-secret".to_string()),
            qwen_api_key: None,
        };
        let rendered = format!("{:?}", secrets);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("***"));
    }
}
