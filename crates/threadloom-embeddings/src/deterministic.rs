use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::{Embeddings, Result, EMBEDDING_DIM};

/// A hash-based embedding provider with no external dependency: every
/// call is deterministic and local, making it suitable for tests and for
/// deployments without a configured embedding model. Vectors from this
/// provider are not semantically meaningful similarity estimates beyond
/// exact/near-duplicate detection, unlike the HTTP-backed provider.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeterministicEmbeddings;

impl DeterministicEmbeddings {
    pub fn new() -> Self {
        DeterministicEmbeddings
    }
}

#[async_trait]
impl Embeddings for DeterministicEmbeddings {
    async fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; EMBEDDING_DIM];
        // Fill the vector 32 bytes (one SHA-256 digest) at a time, each
        // digest keyed by a counter so the stream doesn't repeat.
        let mut counter: u32 = 0;
        while (counter as usize) * 32 < EMBEDDING_DIM {
            let mut hasher = Sha256::new();
            hasher.update(counter.to_le_bytes());
            hasher.update(text.as_bytes());
            let digest = hasher.finalize();
            for (i, byte) in digest.iter().enumerate() {
                let idx = counter as usize * 32 + i;
                if idx >= EMBEDDING_DIM {
                    break;
                }
                vector[idx] = (*byte as f32 / 255.0) - 0.5;
            }
            counter += 1;
        }
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn encode_is_deterministic() {
        let e = DeterministicEmbeddings::new();
        let a = e.encode("hello world").await.unwrap();
        let b = e.encode("hello world").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn encode_has_expected_dimension() {
        let e = DeterministicEmbeddings::new();
        let v = e.encode("anything").await.unwrap();
        assert_eq!(v.len(), EMBEDDING_DIM);
    }

    #[tokio::test]
    async fn distinct_inputs_produce_distinct_vectors() {
        let e = DeterministicEmbeddings::new();
        let a = e.encode("alpha").await.unwrap();
        let b = e.encode("beta").await.unwrap();
        assert_ne!(a, b);
    }
}
