use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("request to model provider failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("model provider not configured: {0}")]
    NotConfigured(&'static str),

    #[error("model provider call timed out")]
    Timeout,
}

pub type Result<T> = std::result::Result<T, Error>;
