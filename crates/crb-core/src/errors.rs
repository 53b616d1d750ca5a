use std::path::PathBuf;

/// Core error type for the relay bot.
///
/// Adapter crates map their specific errors into this type. Completion failures
/// have their own type (`model::CompletionError`) because each variant maps to a
/// different user-facing reply.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("credentials error: {0}")]
    Credentials(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupt table file: {path}: {reason}")]
    CorruptTable { path: PathBuf, reason: String },

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
