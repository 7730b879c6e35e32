//! HTTP-backed embedding provider, targeting an `all-MiniLM-L6-v2`-shaped
//! endpoint (384-dim output). The base URL and API key are read from the
//! environment so a missing configuration disables the subsystem instead
//! of aborting the process.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;

use crate::{Embeddings, Error, Result, EMBEDDING_DIM};

const MODEL_NAME: &str = "all-MiniLM-L6-v2";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct EncodeRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EncodeResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Calls a remote embedding endpoint over HTTP. The API key and base URL
/// are supplied explicitly (construct via [`HttpEmbeddings::from_env`] to
/// read `EMBEDDING_API_URL`/`EMBEDDING_API_KEY`).
pub struct HttpEmbeddings {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl HttpEmbeddings {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        HttpEmbeddings {
            client: Client::builder()
                .timeout(DEFAULT_TIMEOUT)
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
            api_key,
            model: MODEL_NAME.to_string(),
        }
    }

    /// Reads `EMBEDDING_API_URL` (required) and `EMBEDDING_API_KEY`
    /// (optional) from the environment. Returns `None` when the base URL
    /// is absent, signaling the caller to disable this subsystem rather
    /// than fail hard.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("EMBEDDING_API_URL").ok()?;
        let api_key = std::env::var("EMBEDDING_API_KEY").ok();
        Some(Self::new(base_url, api_key))
    }

    async fn encode_once(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut req = self
            .client
            .post(format!("{}/v1/embeddings", self.base_url))
            .json(&EncodeRequest {
                model: &self.model,
                input: texts,
            });
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await?.error_for_status()?;
        let body: EncodeResponse = resp.json().await?;
        if body.embeddings.iter().any(|v| v.len() != EMBEDDING_DIM) {
            return Err(Error::MalformedResponse(format!(
                "expected {EMBEDDING_DIM}-dim vectors, provider returned a different shape"
            )));
        }
        Ok(body.embeddings)
    }
}

#[async_trait]
impl Embeddings for HttpEmbeddings {
    async fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let texts = vec![text.to_string()];
        let strategy = ExponentialBackoff::from_millis(100).map(jitter).take(3);
        let vectors = Retry::spawn(strategy, || self.encode_once(&texts)).await?;
        vectors
            .into_iter()
            .next()
            .ok_or_else(|| Error::MalformedResponse("empty embedding response".into()))
    }

    async fn encode_batch(&self, texts: &[String], batch_size: usize) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(batch_size.max(1)) {
            let strategy = ExponentialBackoff::from_millis(100).map(jitter).take(3);
            let chunk_owned = chunk.to_vec();
            let vectors = Retry::spawn(strategy, || self.encode_once(&chunk_owned)).await?;
            out.extend(vectors);
        }
        Ok(out)
    }
}
