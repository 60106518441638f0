//! Google Gemini integration: chat, structured output and image generation.

pub mod client;
pub mod history;

pub use client::GeminiClient;
