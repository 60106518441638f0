pub mod conversation;
pub mod diary;
pub mod extract;
pub mod providers;
pub mod resilience;
pub mod server;
pub mod services;
pub mod state;
pub mod suggest;

#[cfg(test)]
mod testing;

pub use conversation::{ConversationManager, SessionHandle};
pub use diary::{DiaryPipeline, IllustrationOutcome, Synthesis, save_entry};
pub use extract::{extract, extract_json, extract_suggestions, strip_code_fence};
pub use providers::provider::{CompletionProvider, CompletionRequest, ImageProvider, ProviderError};
pub use resilience::{BoundedExecutor, CompletionError, ErrorClass, RetryDecision, RetryPolicy};
pub use services::Services;
pub use state::GatewayState;
pub use suggest::ReplySuggester;
