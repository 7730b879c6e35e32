use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid identifier {0:?}: {1}")]
    InvalidIdentifier(String, String),
    #[error("postgres connection failed: {0}")]
    Connection(String),
    #[error("postgres query failed: {0}")]
    Query(#[from] tokio_postgres::Error),
    #[error("json (de)serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("channel was referenced by internal id {0} but no such channel exists")]
    UnknownChannel(uuid::Uuid),
    #[error("row failed to decode: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// PostgreSQL identifiers must start with a letter/underscore, contain
/// only alphanumerics/underscores, and fit in 63 bytes. Table/column
/// names built from configuration are validated before being
/// interpolated into SQL.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidIdentifier(name.to_string(), "must not be empty".into()));
    }
    if name.len() > 63 {
        return Err(Error::InvalidIdentifier(name.to_string(), "exceeds 63 characters".into()));
    }
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(Error::InvalidIdentifier(name.to_string(), "must not be empty".into()));
    };
    if !first.is_ascii_alphabetic() && first != '_' {
        return Err(Error::InvalidIdentifier(
            name.to_string(),
            "must start with a letter or underscore".into(),
        ));
    }
    if chars.any(|c| !c.is_ascii_alphanumeric() && c != '_') {
        return Err(Error::InvalidIdentifier(name.to_string(), "contains an invalid character".into()));
    }
    Ok(())
}
