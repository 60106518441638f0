//! Reply drafting for a received message.

use std::sync::Arc;

use haven_core::ReplySuggestion;
use tracing::info;

use crate::extract::extract_suggestions;
use crate::providers::{CompletionProvider, CompletionRequest};
use crate::resilience::{BoundedExecutor, CompletionError};

/// Drafts structured reply suggestions through a completion provider.
#[derive(Clone)]
pub struct ReplySuggester {
    provider: Arc<dyn CompletionProvider>,
    executor: BoundedExecutor,
    model: String,
    prompt: String,
}

impl ReplySuggester {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        executor: BoundedExecutor,
        model: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            executor,
            model: model.into(),
            prompt: prompt.into(),
        }
    }

    /// Draft replies to `received`. Blank input is rejected without a network call.
    pub async fn suggest(&self, received: &str) -> Result<Vec<ReplySuggestion>, CompletionError> {
        let received = received.trim();
        if received.is_empty() {
            return Err(CompletionError::InvalidRequest(
                "received message is empty".to_string(),
            ));
        }

        let request = CompletionRequest::new(&self.model)
            .with_system(&self.prompt)
            .push_user(format!("Received message: {received}"))
            .with_schema(ReplySuggestion::schema());

        let raw = self
            .executor
            .complete(self.provider.as_ref(), &request)
            .await?;

        let suggestions = extract_suggestions(&raw)?;
        info!(
            provider = self.provider.name(),
            count = suggestions.len(),
            "reply suggestions drafted"
        );
        Ok(suggestions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedProvider;

    fn suggester(provider: Arc<ScriptedProvider>) -> ReplySuggester {
        ReplySuggester::new(
            provider,
            BoundedExecutor::default(),
            "test-model",
            "draft replies",
        )
    }

    #[tokio::test]
    async fn test_suggest_parses_fenced_reply() {
        let provider = Arc::new(ScriptedProvider::replies([
            "```json\n[{\"title\":\"Formal\",\"text\":\"Noted.\",\"rationalAnalysis\":\"clear\",\"warmSupport\":\"you got this\"}]\n```",
        ]));

        let suggestions = suggester(provider.clone())
            .suggest("Please finish by Friday")
            .await
            .unwrap();

        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].title, "Formal");

        let request = provider.last_request().unwrap();
        assert_eq!(request.system_instruction(), Some("draft replies"));
        assert_eq!(
            request.turns()[0].content,
            "Received message: Please finish by Friday"
        );
        assert!(request.schema.is_some());
    }

    #[tokio::test]
    async fn test_blank_input_skips_provider() {
        let provider = Arc::new(ScriptedProvider::replies(Vec::<String>::new()));
        let service = suggester(provider.clone());
        let err = service.suggest("   ").await.unwrap_err();

        assert!(matches!(err, CompletionError::InvalidRequest(_)));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_malformed_reply_is_not_retried() {
        let provider = Arc::new(ScriptedProvider::replies(["[{\"title\":\"only\"}]"]));
        let err = suggester(provider.clone()).suggest("hi").await.unwrap_err();

        assert!(matches!(err, CompletionError::MalformedOutput(_)));
        assert_eq!(provider.calls(), 1);
    }
}
