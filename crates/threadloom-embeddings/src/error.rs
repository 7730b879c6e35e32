use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("embedding provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("embedding provider returned malformed response: {0}")]
    MalformedResponse(String),

    #[error("embedding provider not configured: {0}")]
    NotConfigured(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
