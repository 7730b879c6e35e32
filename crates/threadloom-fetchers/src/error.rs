use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("github request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("github graphql returned errors: {0}")]
    GraphQl(String),
    #[error("unexpected github response shape: {0}")]
    MalformedResponse(String),
}

pub type Result<T> = std::result::Result<T, Error>;
