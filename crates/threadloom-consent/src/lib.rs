//! Looks up which hashed authors have active ingestion consent for a
//! given source scope, and filters a message batch down to the consented
//! subset. Fails closed: any backend error behaves as "no one consented".

use std::collections::HashSet;

use async_trait::async_trait;
use thiserror::Error;
use threadloom_core::RawMessage;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("consent backend unavailable: {0}")]
    BackendUnavailable(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Keyed lookup against the external consent store:
/// `(source_scope, author_handle) -> {ingestion_consent_granted, revoked_at?}`.
#[async_trait]
pub trait ConsentRegistry: Send + Sync {
    /// Returns the set of author handles with active ingestion consent
    /// for `source_scope`. On any backend error, implementations must
    /// return `Ok(empty set)`, not propagate the error — fail-closed is
    /// the contract, not a caller-side concern.
    async fn consented_authors(&self, source_scope: &str) -> HashSet<String>;
}

/// Filters `messages` to only those whose `author_handle` is consented
/// under `source_scope`. The consent check is skipped entirely for
/// public-source batches — callers must not invoke this for forum-style
/// sources at all, per the source-type parameter at the call site.
pub async fn filter(
    registry: &dyn ConsentRegistry,
    messages: Vec<RawMessage>,
    source_scope: &str,
) -> (Vec<RawMessage>, usize) {
    let consented = registry.consented_authors(source_scope).await;

    if consented.is_empty() {
        let excluded = messages.len();
        if excluded > 0 {
            tracing::warn!(source_scope, total_messages = excluded, "no_consented_users");
        }
        return (Vec::new(), excluded);
    }

    let mut kept = Vec::with_capacity(messages.len());
    let mut excluded = 0usize;
    for msg in messages {
        if consented.contains(&msg.author_handle) {
            kept.push(msg);
        } else {
            excluded += 1;
        }
    }

    if excluded > 0 {
        tracing::info!(
            source_scope,
            passed = kept.len(),
            excluded,
            "consent_filtered"
        );
    }

    (kept, excluded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use threadloom_core::SourceType;

    struct FixedRegistry(HashSet<String>);

    #[async_trait]
    impl ConsentRegistry for FixedRegistry {
        async fn consented_authors(&self, _source_scope: &str) -> HashSet<String> {
            self.0.clone()
        }
    }

    fn msg(author: &str) -> RawMessage {
        RawMessage {
            message_id: "m".into(),
            author_handle: author.into(),
            content: "hi".into(),
            timestamp: Utc::now(),
            reply_to: None,
            mentions: vec![],
            has_code: false,
            source_type: SourceType::Discord,
        }
    }

    #[tokio::test]
    async fn drops_all_when_no_one_consented() {
        let registry = FixedRegistry(HashSet::new());
        let (kept, excluded) = filter(&registry, vec![msg("a"), msg("b")], "guild-1").await;
        assert!(kept.is_empty());
        assert_eq!(excluded, 2);
    }

    #[tokio::test]
    async fn keeps_only_consented_authors() {
        let mut consented = HashSet::new();
        consented.insert("a".to_string());
        let registry = FixedRegistry(consented);
        let (kept, excluded) = filter(&registry, vec![msg("a"), msg("b"), msg("a")], "guild-1").await;
        assert_eq!(kept.len(), 2);
        assert_eq!(excluded, 1);
    }
}
