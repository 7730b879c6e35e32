use thiserror::Error;

/// Errors raised by domain-model validation shared across every crate in
/// the workspace.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("channel resolution mismatch: expected external id {expected}, found {found}")]
    ChannelResolutionMismatch { expected: String, found: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
