//! Client-side wiring: picks a backend from configuration and builds the
//! conversation, suggestion and diary services on top of it.

use std::sync::Arc;

use haven_core::config::GEMINI_API_KEY_ENV;
use haven_core::{Backend, Config, JsonFileDiaryStore};
use tracing::info;

use crate::conversation::ConversationManager;
use crate::diary::DiaryPipeline;
use crate::providers::{CompletionProvider, GeminiClient, ImageProvider, RelayClient};
use crate::resilience::{BoundedExecutor, CompletionError};
use crate::suggest::ReplySuggester;

/// Everything a front end needs to talk to the assistant.
pub struct Services {
    pub conversations: ConversationManager,
    pub suggester: ReplySuggester,
    pub diaries: DiaryPipeline,
}

impl Services {
    /// Build services for the configured backend.
    ///
    /// The Gemini backend needs `GEMINI_API_KEY` and also provides
    /// illustrations. The relay backend needs no local credential and has no
    /// image backend.
    pub fn from_config(config: &Config) -> Result<Self, CompletionError> {
        let client = &config.settings.client;
        let (text, images) = backend_providers(config)?;
        info!(
            backend = ?client.backend,
            provider = text.name(),
            illustrations = images.is_some(),
            "services configured"
        );

        Ok(Self::new(config, text, images))
    }

    /// Build services on explicit providers.
    pub fn new(
        config: &Config,
        text: Arc<dyn CompletionProvider>,
        images: Option<Arc<dyn ImageProvider>>,
    ) -> Self {
        let settings = &config.settings;
        let executor = BoundedExecutor::from_settings(&settings.resilience);

        Self {
            conversations: ConversationManager::new(
                text.clone(),
                executor,
                settings.client.chat_model(),
                settings.prompts.clone(),
            ),
            suggester: ReplySuggester::new(
                text.clone(),
                executor,
                settings.client.suggestion_model(),
                &settings.prompts.suggestion,
            ),
            diaries: DiaryPipeline::new(
                text,
                images,
                executor,
                settings.client.summary_model(),
                settings.prompts.clone(),
                settings.diary.clone(),
            ),
        }
    }
}

type Providers = (Arc<dyn CompletionProvider>, Option<Arc<dyn ImageProvider>>);

fn backend_providers(config: &Config) -> Result<Providers, CompletionError> {
    let client = &config.settings.client;
    match client.backend {
        Backend::Gemini => {
            let key = config
                .gemini_api_key()
                .ok_or(CompletionError::MissingCredential(GEMINI_API_KEY_ENV))?;
            let gemini = Arc::new(GeminiClient::new(key).with_image_model(&client.image_model));
            let text: Arc<dyn CompletionProvider> = gemini.clone();
            let images: Arc<dyn ImageProvider> = gemini;
            Ok((text, Some(images)))
        }
        Backend::Relay => {
            let text: Arc<dyn CompletionProvider> =
                Arc::new(RelayClient::new(&client.gateway_url));
            Ok((text, None))
        }
    }
}

/// Diary store under the configured data directory.
pub fn diary_store(config: &Config) -> Result<JsonFileDiaryStore, haven_core::SettingsError> {
    Ok(JsonFileDiaryStore::in_dir(config.settings.data_dir()?))
}
