use std::sync::Arc;
use std::time::Duration;

use haven_core::Config;
use tracing::{info, warn};

use crate::providers::{CompletionProvider, DashScopeClient};

/// Shared state for the gateway's HTTP handlers.
///
/// The upstream client carries the credential. It is built once at startup
/// and never leaves the server.
#[derive(Clone)]
pub struct GatewayState {
    upstream: Option<Arc<dyn CompletionProvider>>,
    default_model: String,
    timeout: Duration,
}

impl GatewayState {
    pub fn new(
        upstream: Option<Arc<dyn CompletionProvider>>,
        default_model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            upstream,
            default_model: default_model.into(),
            timeout,
        }
    }

    /// Build the state from loaded configuration.
    ///
    /// A missing `QWEN_API_KEY` is not fatal: the server starts and answers
    /// every chat request with a configuration error.
    pub fn from_config(config: &Config) -> Self {
        let gateway = &config.settings.gateway;
        let upstream = match config.qwen_api_key() {
            Some(key) => {
                info!(url = %gateway.upstream_url, "upstream client configured");
                Some(Arc::new(DashScopeClient::new(key, &gateway.upstream_url))
                    as Arc<dyn CompletionProvider>)
            }
            None => {
                warn!("QWEN_API_KEY is not set; /api/chat will answer 500");
                None
            }
        };

        Self::new(
            upstream,
            &gateway.default_model,
            Duration::from_secs(gateway.timeout_seconds),
        )
    }

    pub fn upstream(&self) -> Option<&Arc<dyn CompletionProvider>> {
        self.upstream.as_ref()
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
