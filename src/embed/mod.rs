pub mod ollama;

use crate::error::ProviderError;
use crate::matrix::ModelId;

pub type Embedding = Vec<f32>;

/// The external embedding-generation collaborator. One call per text; the
/// model is chosen per call because every distance slot is keyed by model.
///
/// Implementations do not retry; retry policy belongs to the caller.
pub trait EmbeddingProvider: Send + Sync {
    fn generate(&self, text: &str, model: &ModelId) -> Result<Embedding, ProviderError>;
}
