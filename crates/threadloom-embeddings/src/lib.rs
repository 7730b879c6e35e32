//! Encodes text into fixed-dimension dense vectors for similarity and
//! storage. Model identity is a build-time constant; encoding is
//! deterministic given input and model, and vectors are comparable under
//! cosine distance.

pub mod error;
mod http;
mod deterministic;

pub use error::{Error, Result};
pub use http::HttpEmbeddings;
pub use deterministic::DeterministicEmbeddings;

use async_trait::async_trait;

/// Fixed embedding dimension this workspace targets, matching the
/// `all-MiniLM-L6-v2` model identity.
pub const EMBEDDING_DIM: usize = 384;

/// A provider capable of encoding text into `EMBEDDING_DIM`-length dense
/// vectors. Implementations may fail (network, quota, malformed
/// response); callers treat an `Err` as "no vector available" and degrade
/// gracefully rather than abort the pipeline.
#[async_trait]
pub trait Embeddings: Send + Sync {
    async fn encode(&self, text: &str) -> Result<Vec<f32>>;

    async fn encode_batch(&self, texts: &[String], batch_size: usize) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(batch_size.max(1)) {
            for text in chunk {
                out.push(self.encode(text).await?);
            }
        }
        Ok(out)
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
