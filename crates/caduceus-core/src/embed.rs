//! Embedding collaborator contract.
//!
//! Producers embed case text before sealing it, so the embedder must be
//! deterministic (same text, same vector) and order-preserving across a
//! batch. Vectors are considered sensitive once derived from case text and
//! only ever leave the producer inside an envelope.

use async_trait::async_trait;

use crate::error::GatewayError;

#[async_trait]
pub trait Embedder: Send + Sync {
    fn name(&self) -> &str;

    /// Encode a batch of texts into vectors, one per input, in input order.
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, GatewayError>;
}

/// Deterministic embedder double: folds the text through FNV-1a and
/// scatters the hash stream into a fixed-width vector. No semantic meaning,
/// but stable across runs, which is all the pipeline tests need.
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    /// The width is clamped to at least one slot.
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    fn encode_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dim];
        let mut state: u32 = 2166136261;
        for byte in text.bytes() {
            state = (state ^ u32::from(byte)).wrapping_mul(16777619);
            let slot = state as usize % self.dim;
            vector[slot] += ((state >> 8) & 0xff) as f32 / 255.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        // Same width as the sentence-transformer models the deployments use.
        Self::new(384)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn name(&self) -> &str {
        "hash"
    }

    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, GatewayError> {
        Ok(texts.iter().map(|text| self.encode_one(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn encoding_is_deterministic() {
        let embedder = HashEmbedder::default();
        let texts = vec!["chest pain, elevated troponin".to_string()];
        let first = embedder.encode(&texts).await.expect("encode");
        let second = embedder.encode(&texts).await.expect("encode");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn batch_order_is_preserved() {
        let embedder = HashEmbedder::default();
        let a = "fever and cough".to_string();
        let b = "fractured radius".to_string();
        let batch = embedder.encode(&[a.clone(), b.clone()]).await.expect("encode");
        let single_a = embedder.encode(&[a]).await.expect("encode");
        let single_b = embedder.encode(&[b]).await.expect("encode");
        assert_eq!(batch[0], single_a[0]);
        assert_eq!(batch[1], single_b[0]);
    }

    #[tokio::test]
    async fn distinct_texts_get_distinct_vectors() {
        let embedder = HashEmbedder::default();
        let vectors = embedder
            .encode(&["sepsis workup".to_string(), "routine checkup".to_string()])
            .await
            .expect("encode");
        assert_ne!(vectors[0], vectors[1]);
    }

    #[tokio::test]
    async fn vectors_have_the_configured_width_and_unit_norm() {
        let embedder = HashEmbedder::new(64);
        let vectors = embedder.encode(&["migraine".to_string()]).await.expect("encode");
        assert_eq!(vectors[0].len(), 64);
        let norm = vectors[0].iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn empty_text_encodes_to_the_zero_vector() {
        let embedder = HashEmbedder::new(8);
        let vectors = embedder.encode(&[String::new()]).await.expect("encode");
        assert!(vectors[0].iter().all(|v| *v == 0.0));
    }

    #[tokio::test]
    async fn zero_width_is_clamped_to_one_slot() {
        let embedder = HashEmbedder::new(0);
        let vectors = embedder.encode(&["tachycardia".to_string()]).await.expect("encode");
        assert_eq!(vectors[0].len(), 1);
    }
}
