use std::time::Duration;

use crate::providers::ProviderError;
use crate::resilience::retry::{ErrorClass, classify};

/// Terminal failure of a completion-facing operation.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("Provider rejected the request (status {status:?}): {detail}")]
    NonRetryableProvider { status: Option<u16>, detail: String },

    #[error("Provider kept failing after {attempts} attempt(s): {detail}")]
    RetryableTransient { attempts: u32, detail: String },

    #[error("Request timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("Malformed model output: {0}")]
    MalformedOutput(String),

    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("Diary synthesis failed: {0}")]
    SynthesisFailed(Box<CompletionError>),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unknown or expired session")]
    UnknownSession,

    #[error("Session already has a message in flight")]
    SessionBusy,
}

impl CompletionError {
    /// Terminal error for a provider failure that ended after `attempts` tries.
    pub fn from_provider(err: ProviderError, attempts: u32) -> Self {
        if let ProviderError::MissingCredential(name) = err {
            return Self::MissingCredential(name);
        }

        let class = classify(&err);
        if class.is_transient() {
            return Self::RetryableTransient {
                attempts,
                detail: err.to_string(),
            };
        }

        let status = match (class, &err) {
            (ErrorClass::Client(status), _) => Some(status),
            (_, ProviderError::ApiError { status, .. }) => Some(*status),
            _ => None,
        };
        Self::NonRetryableProvider {
            status,
            detail: err.to_string(),
        }
    }

    /// Short message safe to show an end user. Never includes provider text.
    pub fn user_notice(&self) -> &'static str {
        match self {
            Self::NonRetryableProvider { .. } => {
                "The assistant couldn't handle that request. Please try rephrasing."
            }
            Self::RetryableTransient { .. } => {
                "The assistant is busy right now. Please try again in a moment."
            }
            Self::Timeout { .. } => "The assistant took too long to answer. Please try again.",
            Self::MalformedOutput(_) => {
                "The assistant's answer came back garbled. Please try again."
            }
            Self::MissingCredential(_) => "The assistant isn't configured yet.",
            Self::SynthesisFailed(_) => {
                "We couldn't write your diary entry. Your conversation is still here."
            }
            Self::InvalidRequest(_) => "There's nothing to send yet.",
            Self::UnknownSession => "This conversation has ended. Please start a new one.",
            Self::SessionBusy => {
                "Please wait for the current reply before sending another message."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_provider_maps_classes() {
        let transient = CompletionError::from_provider(
            ProviderError::ApiError {
                status: 503,
                message: "unavailable".to_string(),
            },
            3,
        );
        assert!(matches!(
            transient,
            CompletionError::RetryableTransient { attempts: 3, .. }
        ));

        let client = CompletionError::from_provider(
            ProviderError::ApiError {
                status: 401,
                message: "bad key".to_string(),
            },
            1,
        );
        assert!(matches!(
            client,
            CompletionError::NonRetryableProvider {
                status: Some(401),
                ..
            }
        ));

        let opaque = CompletionError::from_provider(ProviderError::NoContent, 1);
        assert!(matches!(
            opaque,
            CompletionError::NonRetryableProvider { status: None, .. }
        ));
    }

    #[test]
    fn test_missing_credential_keeps_its_kind() {
        let err =
            CompletionError::from_provider(ProviderError::MissingCredential("QWEN_API_KEY"), 1);
        assert!(matches!(err, CompletionError::MissingCredential(_)));
        assert_eq!(err.to_string(), "Missing credential: QWEN_API_KEY");
        assert_eq!(err.user_notice(), "The assistant isn't configured yet.");
    }

    #[test]
    fn test_user_notice_hides_provider_text() {
        let err = CompletionError::from_provider(
            ProviderError::ApiError {
                status: 400,
                message: "secret internal detail".to_string(),
            },
            1,
        );
        assert!(!err.user_notice().contains("secret"));
        assert!(err.to_string().contains("secret"));
    }
}
