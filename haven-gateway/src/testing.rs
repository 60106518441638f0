//! Scripted provider doubles for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crate::providers::{CompletionProvider, CompletionRequest, ImageProvider, ProviderError};

/// Completion provider that replays a fixed script of results.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<String, ProviderError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    delay: Option<Duration>,
}

impl ScriptedProvider {
    pub fn new(script: impl IntoIterator<Item = Result<String, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    pub fn replies<S: Into<String>>(replies: impl IntoIterator<Item = S>) -> Self {
        Self::new(replies.into_iter().map(|r| Ok(r.into())))
    }

    /// Sleep this long before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait::async_trait]
impl CompletionProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Opaque("script exhausted".to_string())))
    }
}

/// What a [`ScriptedImages`] provider does on every call.
#[derive(Debug, Clone)]
pub enum ImageScript {
    Image(String),
    Decline,
    Fail(u16),
}

/// Image provider with a fixed behavior.
pub struct ScriptedImages {
    script: ImageScript,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedImages {
    pub fn new(script: ImageScript) -> Self {
        Self {
            script,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ImageProvider for ScriptedImages {
    async fn generate_image(
        &self,
        prompt: &str,
        _aspect_ratio: &str,
    ) -> Result<Option<String>, ProviderError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.script {
            ImageScript::Image(uri) => Ok(Some(uri.clone())),
            ImageScript::Decline => Ok(None),
            ImageScript::Fail(status) => Err(ProviderError::ApiError {
                status: *status,
                message: "image backend failed".to_string(),
            }),
        }
    }
}
