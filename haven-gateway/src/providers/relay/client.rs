//! Relay client: sends completion requests through a haven gateway so the
//! caller never holds the upstream credential.

use haven_core::config::QWEN_API_KEY_ENV;
use haven_core::{GatewayErrorBody, GatewayReply, GatewayRequest};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};

use crate::providers::provider::{CompletionProvider, CompletionRequest, ProviderError};

/// Gateway relay client
#[derive(Clone)]
pub struct RelayClient {
    http_client: reqwest::Client,
    url: String,
}

impl RelayClient {
    /// Create a client posting to the gateway endpoint at `url`.
    pub fn new(url: impl Into<String>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http_client,
            url: url.into(),
        }
    }
}

#[async_trait::async_trait]
impl CompletionProvider for RelayClient {
    fn name(&self) -> &str {
        "relay"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let body = GatewayRequest {
            messages: request.messages().to_vec(),
            // A blank model lets the gateway apply its default.
            model: Some(request.model.clone()).filter(|m| !m.trim().is_empty()),
        };

        let response = self.http_client.post(&self.url).json(&body).send().await?;
        let status = response.status();
        let response_text = response.text().await?;

        if status.is_success() {
            let reply: GatewayReply = serde_json::from_str(&response_text)?;
            return Ok(reply.reply);
        }

        // Prefer the gateway's structured error; fall back to the raw body.
        let message = match serde_json::from_str::<GatewayErrorBody>(&response_text) {
            Ok(body) if body.is_missing_upstream_credential() => {
                return Err(ProviderError::MissingCredential(QWEN_API_KEY_ENV));
            }
            Ok(body) => match body.details {
                Some(details) => format!("{}: {}", body.error, details),
                None => body.error,
            },
            Err(_) => response_text,
        };

        Err(ProviderError::ApiError {
            status: status.as_u16(),
            message,
        })
    }
}
