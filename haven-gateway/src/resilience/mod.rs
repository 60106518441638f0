//! Retry classification, deadline enforcement and the error taxonomy every
//! completion-facing operation reports through.

pub mod error;
pub mod executor;
pub mod retry;

pub use error::CompletionError;
pub use executor::BoundedExecutor;
pub use retry::{ErrorClass, RetryDecision, RetryPolicy, classify};
