//! Provider traits and the neutral request type shared by every backend.

use haven_core::{ChatMessage, ChatRole};
use serde_json::Value;

/// A completion request: ordered role-tagged messages, a model id and an
/// optional structured-output schema.
///
/// At most one `system` message is allowed and it must come first. The
/// builder methods keep that invariant; [`CompletionRequest::validate`]
/// checks it for requests assembled from raw message lists.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    messages: Vec<ChatMessage>,
    pub schema: Option<Value>,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            schema: None,
        }
    }

    /// Wrap an already-assembled message list without reordering it.
    pub fn from_messages(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            schema: None,
        }
    }

    /// Set the system instruction, replacing any existing one.
    pub fn with_system(mut self, instruction: impl Into<String>) -> Self {
        self.messages.retain(|m| m.role != ChatRole::System);
        self.messages.insert(0, ChatMessage::system(instruction));
        self
    }

    /// Append prior turns. System messages in `history` are dropped.
    pub fn with_history(mut self, history: impl IntoIterator<Item = ChatMessage>) -> Self {
        let turns = history.into_iter().filter(|m| m.role != ChatRole::System);
        self.messages.extend(turns);
        self
    }

    pub fn push_user(mut self, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage::user(content));
        self
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// The system instruction, if any.
    pub fn system_instruction(&self) -> Option<&str> {
        self.messages
            .first()
            .filter(|m| m.role == ChatRole::System)
            .map(|m| m.content.as_str())
    }

    /// Messages after the system instruction.
    pub fn turns(&self) -> &[ChatMessage] {
        match self.system_instruction() {
            Some(_) => &self.messages[1..],
            None => &self.messages,
        }
    }

    /// Check the single-leading-system-message invariant.
    pub fn validate(&self) -> Result<(), String> {
        if self.messages.is_empty() {
            return Err("request has no messages".to_string());
        }

        let misplaced = self
            .messages
            .iter()
            .enumerate()
            .any(|(i, m)| m.role == ChatRole::System && i != 0);
        if misplaced {
            return Err("system message must be unique and first".to_string());
        }

        Ok(())
    }
}

/// Provider error types.
///
/// Errors are typed at the transport boundary so the retry policy can
/// classify them by status or kind. `Opaque` is the only variant whose
/// message text is inspected.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Transport failure: {0}")]
    Transport(String),
    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },
    #[error("No content in response")]
    NoContent,
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid response format: {0}")]
    InvalidFormat(String),
    /// The remote side has no credential to call its upstream with.
    #[error("{0} is not configured")]
    MissingCredential(&'static str),
    #[error("{0}")]
    Opaque(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return ProviderError::ApiError {
                status: status.as_u16(),
                message: err.to_string(),
            };
        }
        if err.is_connect() || err.is_timeout() || err.is_request() || err.is_body() {
            return ProviderError::Transport(err.to_string());
        }
        if err.is_decode() {
            return ProviderError::InvalidFormat(err.to_string());
        }
        ProviderError::Opaque(err.to_string())
    }
}

/// Chat/completion backend
#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name
    fn name(&self) -> &str;

    /// Send the request and return the raw model text.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError>;
}

/// Image-generation backend
#[async_trait::async_trait]
pub trait ImageProvider: Send + Sync {
    /// Generate one image for `prompt`.
    ///
    /// Returns a `data:<mime>;base64,<payload>` URI, or `None` when the
    /// provider declines to produce an image.
    async fn generate_image(
        &self,
        prompt: &str,
        aspect_ratio: &str,
    ) -> Result<Option<String>, ProviderError>;
}
