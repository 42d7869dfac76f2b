use thiserror::Error;

/// All errors produced by viva-core.
///
/// The taxonomy matters to callers:
/// - `InvalidInput` — reject immediately, never retry.
/// - `External` — the collaborator was retried once already; surface as a
///   degraded result.
/// - `SchemaMismatch` — fatal configuration error, abort the request.
/// - Insufficient acoustic signal is *not* an error; it flows through the
///   feature row as missing values.
#[derive(Debug, Error)]
pub enum VivaError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unreadable audio: {0}")]
    UnreadableAudio(String),

    #[error("resampler error: {0}")]
    Resample(String),

    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("inference error: {0}")]
    Inference(String),

    #[error("feature schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("external service '{service}' failed after retry: {detail}")]
    External { service: String, detail: String },

    #[error("{stage} timed out after {timeout_ms} ms")]
    Timeout { stage: String, timeout_ms: u64 },

    #[error("answer session is closed")]
    SessionClosed,

    #[error("model file not found: {path}")]
    ModelNotFound { path: std::path::PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, VivaError>;
