use thiserror::Error;

/// Errors from comparing two embedding vectors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum VectorError {
    /// The two vectors have different lengths. Never truncated or padded.
    #[error("dimension mismatch: {len_a} vs {len_b}")]
    DimensionMismatch { len_a: usize, len_b: usize },
    /// One of the vectors is the zero vector; cosine distance is undefined.
    #[error("zero-magnitude vector")]
    ZeroMagnitude,
}

/// Failure at the embedding-provider boundary (transport, auth, quota,
/// malformed response). The core never retries; that is the caller's policy.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("provider error: {message}")]
pub struct ProviderError {
    pub message: String,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
