//! Table DDL. A channel is keyed by `(scope, external_id)` — `scope` is
//! the server/repo the channel lives under, `external_id` the
//! channel/category id within it — with `source_type` carried alongside
//! for export's `"<type>:<scope>"` source tag. An article always
//! references a `threads` row resolved alongside it (spec: an article is
//! never persisted without a corresponding resolved thread). Consent is
//! keyed directly by `(source_scope, author_handle)`, same pair the
//! ingest-side `ConsentRegistry` trait resolves against. Column names
//! are fixed (not caller-configurable), so only the embedding dimension
//! and table name prefix need identifier validation before
//! interpolation.

use tokio_postgres::Client;

use crate::error::Result;

pub const CHANNELS_TABLE: &str = "threadloom_channels";
pub const THREADS_TABLE: &str = "threadloom_threads";
pub const ARTICLES_TABLE: &str = "threadloom_articles";
pub const EXPORT_JOBS_TABLE: &str = "threadloom_export_jobs";
pub const CONSENT_RECORDS_TABLE: &str = "threadloom_consent_records";

pub async fn ensure_schema(client: &Client) -> Result<()> {
    client.execute("CREATE EXTENSION IF NOT EXISTS vector", &[]).await?;

    client
        .execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {CHANNELS_TABLE} (
                    id UUID PRIMARY KEY,
                    source_type TEXT NOT NULL,
                    scope TEXT NOT NULL,
                    external_id TEXT NOT NULL,
                    UNIQUE (scope, external_id)
                )"
            ),
            &[],
        )
        .await?;

    client
        .execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {THREADS_TABLE} (
                    id UUID PRIMARY KEY,
                    channel_id UUID NOT NULL REFERENCES {CHANNELS_TABLE}(id),
                    state TEXT NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                    resolved_at TIMESTAMPTZ
                )"
            ),
            &[],
        )
        .await?;

    client
        .execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {ARTICLES_TABLE} (
                    id BIGSERIAL PRIMARY KEY,
                    thread_id UUID NOT NULL REFERENCES {THREADS_TABLE}(id),
                    channel_id UUID NOT NULL REFERENCES {CHANNELS_TABLE}(id),
                    article JSONB NOT NULL,
                    embedding vector(384),
                    quality_score DOUBLE PRECISION NOT NULL,
                    is_visible BOOLEAN NOT NULL DEFAULT TRUE,
                    source_url TEXT,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
                )"
            ),
            &[],
        )
        .await?;

    client
        .execute(
            &format!(
                "CREATE INDEX IF NOT EXISTS {ARTICLES_TABLE}_embedding_idx
                    ON {ARTICLES_TABLE} USING ivfflat (embedding vector_cosine_ops) WITH (lists = 100)"
            ),
            &[],
        )
        .await?;

    client
        .execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {EXPORT_JOBS_TABLE} (
                    id UUID PRIMARY KEY,
                    source_scope TEXT NOT NULL,
                    format TEXT NOT NULL,
                    state TEXT NOT NULL,
                    record_count BIGINT NOT NULL DEFAULT 0,
                    file_path TEXT,
                    content_hash TEXT,
                    manifest_hash TEXT,
                    consent_verified BOOLEAN NOT NULL DEFAULT FALSE,
                    file_size_bytes BIGINT,
                    c2pa_manifest_hash TEXT,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
                )"
            ),
            &[],
        )
        .await?;

    client
        .execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {CONSENT_RECORDS_TABLE} (
                    id UUID PRIMARY KEY,
                    source_scope TEXT NOT NULL,
                    author_handle TEXT NOT NULL,
                    granted BOOLEAN NOT NULL,
                    revoked_at TIMESTAMPTZ,
                    UNIQUE (source_scope, author_handle)
                )"
            ),
            &[],
        )
        .await?;

    Ok(())
}
