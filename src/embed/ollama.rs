use serde::Deserialize;

use super::{Embedding, EmbeddingProvider};
use crate::error::ProviderError;
use crate::matrix::ModelId;

/// Embedding provider backed by a local Ollama server.
pub struct OllamaProvider {
    base_url: String,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaProvider {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new("http://localhost:11434")
    }
}

impl EmbeddingProvider for OllamaProvider {
    fn generate(&self, text: &str, model: &ModelId) -> Result<Embedding, ProviderError> {
        let text = if text.is_empty() { " " } else { text };
        // Truncate very long texts to avoid overwhelming the model
        let text = truncate_utf8(text, 8192);

        let url = format!("{}/api/embeddings", self.base_url);
        let body = serde_json::json!({
            "model": model.as_str(),
            "prompt": text,
        });

        let mut response = match ureq::post(&url).send_json(&body) {
            Ok(r) => r,
            Err(ureq::Error::StatusCode(code)) => {
                return Err(ProviderError::new(format!("ollama returned HTTP {code}")));
            }
            Err(e) => {
                return Err(ProviderError::new(format!(
                    "ollama embedding request failed: {e}"
                )));
            }
        };

        let resp: EmbeddingResponse = response
            .body_mut()
            .read_json()
            .map_err(|e| ProviderError::new(format!("parsing ollama response: {e}")))?;

        if resp.embedding.is_empty() {
            return Err(ProviderError::new(format!(
                "ollama returned an empty embedding for model {model}"
            )));
        }

        Ok(resp.embedding)
    }
}

/// Cut `text` to at most `max` bytes without splitting a UTF-8 character.
fn truncate_utf8(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(truncate_utf8("hello", 8192), "hello");
    }

    #[test]
    fn ascii_cuts_at_exact_limit() {
        let text = "a".repeat(9000);
        assert_eq!(truncate_utf8(&text, 8192).len(), 8192);
    }

    #[test]
    fn multibyte_cut_lands_on_char_boundary() {
        // 3-byte characters put byte 8192 mid-character.
        let text = "\u{20ac}".repeat(3000);
        let cut = truncate_utf8(&text, 8192);
        assert_eq!(cut.len(), 8190);
        assert!(cut.chars().all(|c| c == '\u{20ac}'));
    }

    #[test]
    fn boundary_exactly_at_limit_is_kept() {
        // 2-byte characters: 4096 of them end exactly at byte 8192.
        let text = "\u{e9}".repeat(4100);
        assert_eq!(truncate_utf8(&text, 8192).len(), 8192);
    }
}
