//! Embedding capability and vector utilities
//!
//! The embedding backend is an external capability: the pipeline consumes
//! whatever vectors it is given and never selects a model itself. The
//! hash-based backend below generates deterministic unit vectors so the full
//! pipeline can be exercised without a real model.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// Errors that can occur during embedding generation.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// The backend is not available.
    #[error("embedding backend unavailable: {0}")]
    Unavailable(String),

    /// Invalid input text.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Backend inference failure.
    #[error("embedding inference failed: {0}")]
    InferenceFailed(String),
}

/// Reported availability of an embedding backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendStatus {
    /// The backend is ready; carries its name for diagnostics.
    Ready(String),
    /// The backend cannot serve requests.
    Unavailable(String),
}

/// Trait for embedding backends.
pub trait EmbeddingBackend: Send + Sync {
    /// Embed a batch of texts, one vector per input, in order.
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Dimension of the vectors this backend produces.
    fn dimension(&self) -> usize;

    /// Availability report.
    fn status(&self) -> BackendStatus;
}

/// Deterministic hash-based embedding backend.
///
/// The embeddings are:
///
/// - **Deterministic**: same text always produces the same vector
/// - **Normalized**: unit length, so cosine similarity is well defined
/// - **Diverse**: different texts produce different vectors
///
/// Suitable for tests and offline runs; not semantically meaningful.
pub struct HashEmbeddingBackend {
    dimension: usize,
}

impl HashEmbeddingBackend {
    /// Create a backend producing vectors of the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn hash_with_seed(text: &str, seed: u64) -> f32 {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        seed.hash(&mut hasher);
        let hash_value = hasher.finish();

        // Map the hash into [-1, 1]
        let normalized = (hash_value as f64 / u64::MAX as f64) * 2.0 - 1.0;
        normalized as f32
    }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.is_empty() {
            return Err(EmbeddingError::InvalidInput(
                "empty text cannot be embedded".to_string(),
            ));
        }

        let mut embedding = Vec::with_capacity(self.dimension);
        for i in 0..self.dimension {
            embedding.push(Self::hash_with_seed(text, i as u64));
        }

        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut embedding {
                *value /= magnitude;
            }
        }

        Ok(embedding)
    }
}

impl EmbeddingBackend for HashEmbeddingBackend {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts.iter().map(|t| self.embed_one(t)).collect()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn status(&self) -> BackendStatus {
        BackendStatus::Ready("hash".to_string())
    }
}

/// Calculate cosine similarity between two embedding vectors.
///
/// Returns a value in [-1, 1]; 0.0 when either vector has zero magnitude.
///
/// # Panics
///
/// Panics if the vectors have different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "vectors must have the same length");

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}

/// Mean of a set of vectors; `None` for an empty set.
pub fn centroid(vectors: &[&[f32]]) -> Option<Vec<f32>> {
    let first = vectors.first()?;
    let mut sum = vec![0.0f32; first.len()];
    for v in vectors {
        for (s, x) in sum.iter_mut().zip(v.iter()) {
            *s += x;
        }
    }
    let n = vectors.len() as f32;
    for s in &mut sum {
        *s /= n;
    }
    Some(sum)
}

impl BackendStatus {
    /// Whether the backend can serve requests.
    pub fn is_ready(&self) -> bool {
        matches!(self, BackendStatus::Ready(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_embedding_deterministic() {
        let backend = HashEmbeddingBackend::new(128);
        let texts = vec!["The quick brown fox".to_string()];
        let a = backend.embed(&texts).unwrap();
        let b = backend.embed(&texts).unwrap();
        assert_eq!(a, b, "same text should produce same embedding");
    }

    #[test]
    fn test_hash_embedding_dimension() {
        let backend = HashEmbeddingBackend::new(64);
        let out = backend.embed(&["test".to_string()]).unwrap();
        assert_eq!(out[0].len(), 64);
        assert_eq!(backend.dimension(), 64);
    }

    #[test]
    fn test_hash_embedding_normalized() {
        let backend = HashEmbeddingBackend::new(128);
        let out = backend.embed(&["test text".to_string()]).unwrap();
        let magnitude: f32 = out[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 0.0001, "embedding should be normalized");
    }

    #[test]
    fn test_hash_embedding_batch_order() {
        let backend = HashEmbeddingBackend::new(32);
        let texts = vec!["alpha".to_string(), "beta".to_string()];
        let out = backend.embed(&texts).unwrap();
        assert_eq!(out.len(), 2);
        assert_ne!(out[0], out[1]);

        let alpha_alone = backend.embed(&["alpha".to_string()]).unwrap();
        assert_eq!(out[0], alpha_alone[0]);
    }

    #[test]
    fn test_hash_embedding_empty_text() {
        let backend = HashEmbeddingBackend::new(32);
        let result = backend.embed(&["".to_string()]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let v = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        let a = vec![0.0, 0.0];
        let b = vec![1.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_centroid() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        let c = centroid(&[&a, &b]).unwrap();
        assert_eq!(c, vec![0.5, 0.5]);
        assert!(centroid(&[]).is_none());
    }

    #[test]
    fn test_status() {
        let backend = HashEmbeddingBackend::new(8);
        assert!(backend.status().is_ready());
    }
}
