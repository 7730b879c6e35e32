use async_trait::async_trait;
use threadloom_core::{CompiledArticle, SourceType};

use crate::error::SinkError;

/// Persists a compiled article. Implemented by `threadloom-store`; kept
/// as a trait here so the worker pool never depends on a storage
/// backend directly. Transport-level failures should be returned as
/// `Err` so the worker's retry loop can back off and try again —
/// anything else (a malformed article) should never reach this trait,
/// since `CompiledArticle::validate` already ran inside the compiler
/// node.
#[async_trait]
pub trait ArticleSink: Send + Sync {
    async fn store(
        &self,
        article: CompiledArticle,
        quality_score: f64,
        source_type: SourceType,
        source_scope: &str,
        channel_scope: &str,
    ) -> Result<(), SinkError>;
}
