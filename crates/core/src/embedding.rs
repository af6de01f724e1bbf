//! Embeddings and the similarity primitive.
//!
//! Embeddings produced by the configured model are expected to be
//! unit-normalised, so the plain dot product doubles as cosine similarity.

use async_trait::async_trait;

use crate::error::{Error, ProviderError, Result};

/// A dense embedding vector. All vectors from one model share a length.
pub type Embedding = Vec<f32>;

/// Dot product of two embeddings.
///
/// Fails with [`Error::DimensionMismatch`] when the lengths differ rather than
/// silently truncating to the shorter vector.
pub fn similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(Error::DimensionMismatch { left: a.len(), right: b.len() });
    }
    Ok(a.iter().zip(b.iter()).map(|(x, y)| x * y).sum())
}

/// Scale `v` to unit length in place. A zero vector is left untouched.
pub fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Turns text into an embedding.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// A human-readable name for this embedder (e.g., "openai").
    fn name(&self) -> &str;

    async fn embed(&self, text: &str) -> std::result::Result<Embedding, ProviderError>;

    /// Embed several texts, preserving order.
    ///
    /// Default implementation embeds one text at a time.
    async fn embed_batch(
        &self,
        texts: &[String],
    ) -> std::result::Result<Vec<Embedding>, ProviderError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn similarity_is_dot_product() {
        let s = similarity(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]).unwrap();
        assert!((s - 32.0).abs() < 1e-6);
    }

    #[test]
    fn similarity_is_symmetric() {
        let a = [0.3, -0.2, 0.9];
        let b = [0.1, 0.8, -0.4];
        assert_eq!(similarity(&a, &b).unwrap(), similarity(&b, &a).unwrap());
    }

    #[test]
    fn unit_vector_with_itself_is_one() {
        let mut v = vec![3.0, 4.0];
        normalize(&mut v);
        assert!((similarity(&v, &v).unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn orthogonal_vectors_score_zero() {
        assert_eq!(similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap(), 0.0);
    }

    #[test]
    fn dimension_mismatch_fails() {
        let err = similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { left: 2, right: 3 }));
    }

    #[test]
    fn normalize_leaves_zero_vector() {
        let mut v = vec![0.0, 0.0];
        normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0]);
    }

    struct Echo;

    #[async_trait]
    impl Embedder for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn embed(&self, text: &str) -> std::result::Result<Embedding, ProviderError> {
            Ok(vec![text.len() as f32])
        }
    }

    #[tokio::test]
    async fn default_batch_preserves_order() {
        let out = Echo
            .embed_batch(&["a".to_string(), "abc".to_string(), "ab".to_string()])
            .await
            .unwrap();
        assert_eq!(out, vec![vec![1.0], vec![3.0], vec![2.0]]);
    }
}
