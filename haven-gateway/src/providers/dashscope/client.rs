//! DashScope text-generation API client.

use haven_core::ChatMessage;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::providers::provider::{CompletionProvider, CompletionRequest, ProviderError};

pub const DEFAULT_URL: &str =
    "https://dashscope.aliyuncs.com/api/v1/services/aigc/text-generation/generation";

/// DashScope API client
#[derive(Clone)]
pub struct DashScopeClient {
    http_client: reqwest::Client,
    api_key: String,
    url: String,
}

/// Request body for the generation endpoint
#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    model: &'a str,
    input: GenerationInput<'a>,
    parameters: GenerationParameters,
}

#[derive(Debug, Serialize)]
struct GenerationInput<'a> {
    messages: &'a [ChatMessage],
}

#[derive(Debug, Serialize)]
struct GenerationParameters {
    result_format: &'static str,
}

/// Response from the generation endpoint
#[derive(Debug, Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    output: Option<GenerationOutput>,
    #[serde(default)]
    request_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerationOutput {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl DashScopeClient {
    /// Create a client for `url` authenticated with `api_key`.
    pub fn new(api_key: impl Into<String>, url: impl Into<String>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http_client,
            api_key: api_key.into(),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl CompletionProvider for DashScopeClient {
    fn name(&self) -> &str {
        "dashscope"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let body = GenerationRequest {
            model: &request.model,
            input: GenerationInput {
                messages: request.messages(),
            },
            parameters: GenerationParameters {
                result_format: "message",
            },
        };

        let response = self
            .http_client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: response_text,
            });
        }

        let parsed: GenerationResponse = serde_json::from_str(&response_text)?;
        debug!(request_id = ?parsed.request_id, model = %request.model, "dashscope reply received");

        parsed
            .output
            .and_then(|output| output.choices.into_iter().next())
            .and_then(|choice| choice.message.content)
            .ok_or(ProviderError::NoContent)
    }
}
