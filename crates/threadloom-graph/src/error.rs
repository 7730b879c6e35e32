use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("node {0:?} not found in graph")]
    NodeNotFound(String),

    #[error("no entry point set for graph")]
    MissingEntryPoint,

    #[error("conditional edge routed to unknown node {0:?}")]
    UnknownRoute(String),

    #[error("checkpoint not found for thread {0:?}")]
    CheckpointNotFound(String),

    #[error("node {node:?} failed: {source}")]
    NodeFailed {
        node: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
