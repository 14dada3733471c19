//! # Daybook Errors
//!
//! Error handling for the daily-note summarization pipeline.
//!
//! - Uses `thiserror` for structured error definitions
//! - Every handler-facing failure maps onto exactly one variant so the
//!   server boundary can turn it into a status code without inspection

use thiserror::Error;

pub type DigestResult<T> = Result<T, DigestError>;

#[derive(Debug, Error)]
pub enum DigestError {
    /// Inbound message failed current/next signing-key verification.
    #[error("invalid message signature")]
    InvalidSignature,

    /// The summarization model returned a response with no text content.
    #[error("no content found in model response")]
    EmptyModelResponse,

    /// The URL classifier did not return the expected `usefulUrls` shape.
    #[error("failed to parse URL classification response: {reason}")]
    ClassificationParseError { reason: String },

    /// The synthesis response could not be parsed, even after best-effort
    /// JSON extraction.
    #[error("failed to parse synthesis response: {reason}")]
    SynthesisParseError { reason: String },

    /// The delivery provider rejected a publish/enqueue call.
    #[error("dispatch failed: {status} - {message}")]
    DispatchFailed { status: u16, message: String },

    /// A model API returned a non-success status.
    #[error("model API error: {status} - {message}")]
    ModelApi { status: u16, message: String },

    /// The note-storage backend returned a non-success status.
    #[error("note store error: {status} - {message}")]
    NoteStoreApi { status: u16, message: String },

    #[error("calendar error: {0}")]
    Calendar(String),

    #[error("storage error: {backend} - {reason}")]
    Storage { backend: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<redis::RedisError> for DigestError {
    fn from(err: redis::RedisError) -> Self {
        DigestError::Storage {
            backend: "Redis".to_string(),
            reason: err.to_string(),
        }
    }
}

impl DigestError {
    /// Failures the at-least-once delivery provider is expected to retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::EmptyModelResponse
                | Self::Http(_)
                | Self::Storage { .. }
                | Self::ModelApi { .. }
        )
    }
}
