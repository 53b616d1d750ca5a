use std::time::Duration;

use async_trait::async_trait;

/// Fixed generation budget for every completion request.
pub const MAX_OUTPUT_TOKENS: u32 = 1024;

/// Failures a completion backend can report.
///
/// An empty completion is *not* an error: the orchestrator handles it.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    /// Prompt plus requested output does not fit the backend's context window.
    #[error("prompt too long: {0}")]
    TooLong(String),

    #[error("completion timed out after {0:?}")]
    Timeout(Duration),

    #[error("completion backend error: {0}")]
    Backend(String),
}

/// Single-shot text completion.
///
/// Implementations must bound their own wait time and report it as
/// `CompletionError::Timeout`.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        temperature: f64,
    ) -> std::result::Result<String, CompletionError>;
}
