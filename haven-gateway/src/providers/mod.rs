pub mod dashscope;
pub mod gemini;
pub mod provider;
pub mod relay;

pub use dashscope::DashScopeClient;
pub use gemini::GeminiClient;
pub use provider::{CompletionProvider, CompletionRequest, ImageProvider, ProviderError};
pub use relay::RelayClient;
