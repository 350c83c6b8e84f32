use crate::error::VectorError;

/// Cosine distance between two equal-length vectors: `1 - dot/(|a|·|b|)`.
///
/// Accumulates in f64 regardless of the input precision. The result is not
/// clamped: well-formed unit-ish embeddings keep it in [0, 1], but nothing
/// here assumes that.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> Result<f64, VectorError> {
    if a.len() != b.len() {
        return Err(VectorError::DimensionMismatch {
            len_a: a.len(),
            len_b: b.len(),
        });
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for i in 0..a.len() {
        let (x, y) = (a[i] as f64, b[i] as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(VectorError::ZeroMagnitude);
    }

    Ok(1.0 - dot / (norm_a.sqrt() * norm_b.sqrt()))
}
