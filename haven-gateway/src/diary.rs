//! Diary synthesis: summarize a text, then try to illustrate the summary.
//!
//! Summarization is required and its failure aborts the whole synthesis.
//! Illustration is best-effort; its outcome is reported next to the entry
//! and never blocks it.

use std::sync::Arc;

use haven_core::{DiaryEntry, DiarySettings, DiaryStore, PromptSettings, StoreError, prepend_entry};
use tracing::{info, warn};

use crate::conversation::{ConversationManager, SessionHandle};
use crate::providers::{CompletionProvider, CompletionRequest, ImageProvider};
use crate::resilience::{BoundedExecutor, CompletionError};

/// What happened to the illustration stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IllustrationOutcome {
    /// An image was attached to the entry.
    Generated,
    /// The provider answered without an image.
    Declined,
    /// No image backend is configured.
    Skipped,
    /// The image call failed; the entry was created without one.
    Failed(String),
}

/// A finished diary entry plus the illustration outcome.
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub entry: DiaryEntry,
    pub illustration: IllustrationOutcome,
}

/// Two-stage diary synthesis. Holds no state between calls.
#[derive(Clone)]
pub struct DiaryPipeline {
    text: Arc<dyn CompletionProvider>,
    images: Option<Arc<dyn ImageProvider>>,
    executor: BoundedExecutor,
    summary_model: String,
    prompts: PromptSettings,
    settings: DiarySettings,
}

impl DiaryPipeline {
    pub fn new(
        text: Arc<dyn CompletionProvider>,
        images: Option<Arc<dyn ImageProvider>>,
        executor: BoundedExecutor,
        summary_model: impl Into<String>,
        prompts: PromptSettings,
        settings: DiarySettings,
    ) -> Self {
        Self {
            text,
            images,
            executor,
            summary_model: summary_model.into(),
            prompts,
            settings,
        }
    }

    /// Stage 1: condense `source` into a short reflective passage.
    pub async fn summarize(&self, source: &str) -> Result<String, CompletionError> {
        let request = CompletionRequest::new(&self.summary_model)
            .with_system(&self.prompts.summary)
            .push_user(source);

        let summary = self.executor.complete(self.text.as_ref(), &request).await?;
        let summary = summary.trim();
        if summary.is_empty() {
            return Ok(self.prompts.fallback_summary.clone());
        }
        Ok(summary.to_string())
    }

    /// Stage 2: try to produce one illustration for `summary`.
    pub async fn illustrate(&self, summary: &str) -> (Option<String>, IllustrationOutcome) {
        let Some(images) = &self.images else {
            return (None, IllustrationOutcome::Skipped);
        };

        let prompt = self.prompts.image_prompt(summary);
        let aspect_ratio = self.settings.aspect_ratio.as_str();
        let result = self
            .executor
            .execute(|_| images.generate_image(&prompt, aspect_ratio))
            .await;

        match result {
            Ok(Some(uri)) => (Some(uri), IllustrationOutcome::Generated),
            Ok(None) => (None, IllustrationOutcome::Declined),
            Err(err) => {
                warn!(error = %err, "illustration failed; keeping entry without image");
                (None, IllustrationOutcome::Failed(err.to_string()))
            }
        }
    }

    /// Summarize `source` and illustrate it.
    pub async fn synthesize(&self, source: &str) -> Result<Synthesis, CompletionError> {
        if source.trim().is_empty() {
            return Err(CompletionError::InvalidRequest(
                "nothing to write about".to_string(),
            ));
        }
        let text = source.to_string();
        self.synthesize_with_source(source, text).await
    }

    /// Turn a conversation into a diary entry, then start the session over.
    ///
    /// The summary covers the full transcript; the entry's source content is a
    /// persona-labelled recap cut to `[diary] recap_chars`. The session is
    /// reset only when synthesis succeeds, so a failure leaves the
    /// conversation untouched. Returns the synthesis and the new handle.
    pub async fn synthesize_conversation(
        &self,
        conversations: &ConversationManager,
        handle: SessionHandle,
    ) -> Result<(Synthesis, SessionHandle), CompletionError> {
        let persona = conversations.persona(handle)?;
        let transcript = conversations.transcript(handle)?;
        if transcript.is_empty() {
            return Err(CompletionError::InvalidRequest(
                "conversation is empty".to_string(),
            ));
        }

        let recap = format!(
            "Conversation with [{}] recap:\n{}",
            persona.display_name(),
            truncate_chars(&transcript, self.settings.recap_chars)
        );
        let synthesis = self.synthesize_with_source(&transcript, recap).await?;
        let fresh = conversations.reset(handle)?;

        Ok((synthesis, fresh))
    }

    async fn synthesize_with_source(
        &self,
        text: &str,
        source_content: String,
    ) -> Result<Synthesis, CompletionError> {
        let summary = self
            .summarize(text)
            .await
            .map_err(|err| CompletionError::SynthesisFailed(Box::new(err)))?;

        let (image, illustration) = self.illustrate(&summary).await;
        let entry = DiaryEntry::new(source_content, summary, image.into_iter().collect());

        info!(
            entry_id = entry.id(),
            illustration = ?illustration,
            "diary entry synthesized"
        );
        Ok(Synthesis {
            entry,
            illustration,
        })
    }
}

/// Prepend `entry` to the stored diaries and persist the full list.
pub fn save_entry(
    store: &dyn DiaryStore,
    entry: DiaryEntry,
) -> Result<Vec<DiaryEntry>, StoreError> {
    prepend_entry(store, entry)
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
