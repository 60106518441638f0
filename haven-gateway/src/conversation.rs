//! Persona-scoped conversations.
//!
//! Each session is bound to one persona and addressed by an opaque
//! [`SessionHandle`]. Switching persona or resetting replaces the session
//! wholesale: the old handle stops working and its history is gone. At most
//! one `send` may be in flight per session.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use haven_core::{ChatMessage, ChatRole, Persona, PromptSettings};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::providers::{CompletionProvider, CompletionRequest};
use crate::resilience::{BoundedExecutor, CompletionError};

/// Opaque identifier of one conversation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle(Uuid);

impl SessionHandle {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct ConversationSession {
    persona: Persona,
    instruction: String,
    history: Vec<ChatMessage>,
    in_flight: bool,
}

/// Owns every live session and talks to the provider on their behalf.
pub struct ConversationManager {
    provider: Arc<dyn CompletionProvider>,
    executor: BoundedExecutor,
    model: String,
    prompts: PromptSettings,
    sessions: Mutex<HashMap<SessionHandle, ConversationSession>>,
}

/// Clears the in-flight flag when a `send` finishes or is cancelled.
struct InFlightGuard<'a> {
    manager: &'a ConversationManager,
    handle: SessionHandle,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if let Some(session) = self.manager.sessions().get_mut(&self.handle) {
            session.in_flight = false;
        }
    }
}

impl ConversationManager {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        executor: BoundedExecutor,
        model: impl Into<String>,
        prompts: PromptSettings,
    ) -> Self {
        Self {
            provider,
            executor,
            model: model.into(),
            prompts,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    // A panic while holding the lock leaves the map itself consistent.
    fn sessions(&self) -> MutexGuard<'_, HashMap<SessionHandle, ConversationSession>> {
        self.sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Start an empty session for `persona`.
    pub fn open(&self, persona: Persona) -> SessionHandle {
        let handle = SessionHandle::new();
        let session = ConversationSession {
            persona,
            instruction: persona.instruction(&self.prompts),
            history: Vec::new(),
            in_flight: false,
        };
        self.sessions().insert(handle, session);
        info!(session = %handle, persona = %persona, "conversation opened");
        handle
    }

    /// Replace the session with a fresh, empty one for `persona`.
    ///
    /// The previous history is discarded and `handle` becomes invalid.
    pub fn switch_persona(
        &self,
        handle: SessionHandle,
        persona: Persona,
    ) -> Result<SessionHandle, CompletionError> {
        self.close(handle)?;
        Ok(self.open(persona))
    }

    /// Start over with the same persona.
    pub fn reset(&self, handle: SessionHandle) -> Result<SessionHandle, CompletionError> {
        let persona = self.persona(handle)?;
        self.switch_persona(handle, persona)
    }

    /// Drop a session and its history.
    pub fn close(&self, handle: SessionHandle) -> Result<(), CompletionError> {
        let removed = self.sessions().remove(&handle);
        match removed {
            Some(session) => {
                debug!(session = %handle, turns = session.history.len(), "conversation closed");
                Ok(())
            }
            None => Err(CompletionError::UnknownSession),
        }
    }

    pub fn persona(&self, handle: SessionHandle) -> Result<Persona, CompletionError> {
        self.sessions()
            .get(&handle)
            .map(|s| s.persona)
            .ok_or(CompletionError::UnknownSession)
    }

    pub fn history(&self, handle: SessionHandle) -> Result<Vec<ChatMessage>, CompletionError> {
        self.sessions()
            .get(&handle)
            .map(|s| s.history.clone())
            .ok_or(CompletionError::UnknownSession)
    }

    /// Render the history as `User: ...` / `AI: ...` lines.
    pub fn transcript(&self, handle: SessionHandle) -> Result<String, CompletionError> {
        let history = self.history(handle)?;
        Ok(history
            .iter()
            .map(|m| {
                let speaker = match m.role {
                    ChatRole::User => "User",
                    _ => "AI",
                };
                format!("{speaker}: {}", m.content)
            })
            .collect::<Vec<_>>()
            .join("\n"))
    }

    /// Send a user message and wait for the persona's reply.
    ///
    /// The user message stays in history even if the call fails. The reply is
    /// appended only on success, and only if the session still exists.
    pub async fn send(&self, handle: SessionHandle, text: &str) -> Result<String, CompletionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CompletionError::InvalidRequest("message is empty".to_string()));
        }

        let request = {
            let mut sessions = self.sessions();
            let session = sessions
                .get_mut(&handle)
                .ok_or(CompletionError::UnknownSession)?;
            if session.in_flight {
                return Err(CompletionError::SessionBusy);
            }

            session.history.push(ChatMessage::user(text));
            session.in_flight = true;

            CompletionRequest::new(&self.model)
                .with_system(&session.instruction)
                .with_history(session.history.iter().cloned())
        };
        let _guard = InFlightGuard {
            manager: self,
            handle,
        };

        let provider = self.provider.as_ref();
        let result = self.executor.complete(provider, &request).await;

        let mut sessions = self.sessions();
        let Some(session) = sessions.get_mut(&handle) else {
            warn!(session = %handle, "reply arrived for a session that no longer exists");
            return Err(CompletionError::UnknownSession);
        };

        match result {
            Ok(reply) => {
                session.history.push(ChatMessage::assistant(&reply));
                debug!(session = %handle, turns = session.history.len(), "reply appended");
                Ok(reply)
            }
            Err(err) => {
                warn!(session = %handle, error = %err, "send failed");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderError;
    use crate::testing::ScriptedProvider;
    use std::time::Duration;

    fn manager(provider: Arc<ScriptedProvider>) -> ConversationManager {
        ConversationManager::new(
            provider,
            BoundedExecutor::default(),
            "chat-model",
            PromptSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_send_appends_both_turns() {
        let provider = Arc::new(ScriptedProvider::replies(["Take a breath."]));
        let conversations = manager(provider.clone());
        let handle = conversations.open(Persona::Mentor);

        let reply = conversations.send(handle, "I'm stressed").await.unwrap();
        assert_eq!(reply, "Take a breath.");

        let history = conversations.history(handle).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1], ChatMessage::assistant("Take a breath."));

        let request = provider.last_request().unwrap();
        assert_eq!(
            request.system_instruction(),
            Some(Persona::Mentor.default_instruction())
        );
        assert_eq!(request.turns().len(), 1);
    }

    #[tokio::test]
    async fn test_switch_persona_discards_history() {
        let provider = Arc::new(ScriptedProvider::replies(["ok"]));
        let conversations = manager(provider);
        let handle = conversations.open(Persona::Senior);
        conversations.send(handle, "hello").await.unwrap();

        let switched = conversations
            .switch_persona(handle, Persona::Friend)
            .unwrap();

        assert_ne!(switched, handle);
        assert_eq!(conversations.history(switched).unwrap().len(), 0);
        assert_eq!(conversations.persona(switched).unwrap(), Persona::Friend);
        assert!(matches!(
            conversations.history(handle),
            Err(CompletionError::UnknownSession)
        ));
    }

    #[tokio::test]
    async fn test_failed_send_keeps_user_turn_only() {
        let provider = Arc::new(ScriptedProvider::new([Err(ProviderError::ApiError {
            status: 400,
            message: "bad request".to_string(),
        })]));
        let conversations = manager(provider);
        let handle = conversations.open(Persona::Senior);

        let err = conversations.send(handle, "hi").await.unwrap_err();
        assert!(matches!(err, CompletionError::NonRetryableProvider { .. }));

        let history = conversations.history(handle).unwrap();
        assert_eq!(history, vec![ChatMessage::user("hi")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_send_is_rejected() {
        let provider = Arc::new(
            ScriptedProvider::replies(["first", "second"]).with_delay(Duration::from_millis(50)),
        );
        let conversations = manager(provider);
        let handle = conversations.open(Persona::Friend);

        let (a, b) = tokio::join!(
            conversations.send(handle, "one"),
            conversations.send(handle, "two")
        );

        assert_eq!(a.unwrap(), "first");
        assert!(matches!(b, Err(CompletionError::SessionBusy)));
        assert_eq!(conversations.history(handle).unwrap().len(), 2);

        // The flag is cleared once the first send completes.
        assert_eq!(conversations.send(handle, "three").await.unwrap(), "second");
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_for_switched_session_is_dropped() {
        let provider = ScriptedProvider::replies(["late"]).with_delay(Duration::from_millis(50));
        let conversations = manager(Arc::new(provider));
        let handle = conversations.open(Persona::Senior);

        let switch = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            conversations
                .switch_persona(handle, Persona::Mentor)
                .unwrap()
        };
        let (sent, fresh) = tokio::join!(conversations.send(handle, "hello"), switch);

        assert!(matches!(sent, Err(CompletionError::UnknownSession)));
        assert!(conversations.history(fresh).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_message_is_rejected() {
        let provider = Arc::new(ScriptedProvider::replies(Vec::<String>::new()));
        let conversations = manager(provider.clone());
        let handle = conversations.open(Persona::Senior);

        assert!(matches!(
            conversations.send(handle, "  ").await,
            Err(CompletionError::InvalidRequest(_))
        ));
        assert_eq!(provider.calls(), 0);
        assert!(conversations.history(handle).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transcript_and_reset() {
        let provider = Arc::new(ScriptedProvider::replies(["hey there"]));
        let conversations = manager(provider);
        let handle = conversations.open(Persona::Friend);
        conversations.send(handle, "hi").await.unwrap();

        assert_eq!(
            conversations.transcript(handle).unwrap(),
            "User: hi\nAI: hey there"
        );

        let fresh = conversations.reset(handle).unwrap();
        assert_eq!(conversations.persona(fresh).unwrap(), Persona::Friend);
        assert!(conversations.transcript(fresh).unwrap().is_empty());
        assert!(matches!(
            conversations.close(handle),
            Err(CompletionError::UnknownSession)
        ));
    }
}
