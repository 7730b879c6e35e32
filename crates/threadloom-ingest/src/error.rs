use thiserror::Error;

pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("extraction graph failed: {0}")]
    Graph(#[from] threadloom_graph::Error),
    #[error("article sink failed after retries: {0}")]
    SinkExhausted(SinkError),
}

pub type Result<T> = std::result::Result<T, Error>;
