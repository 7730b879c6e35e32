//! A single Postgres connection wrapped for concurrent use, backing
//! channel resolution, article persistence, and export-job bookkeeping.
//! `source_scope`/`channel_scope` (server-or-repo id / channel-or-
//! category id) are the same two-part key used throughout the ingest
//! pipeline; here they double as the `(scope, external_id)` pair passed
//! to [`PgStore::resolve_or_create_channel`], alongside the channel's
//! `source_type`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use threadloom_core::{CompiledArticle, ExportJob, ExportState, SourceType, StoredArticle};
use threadloom_embeddings::Embeddings;
use threadloom_ingest::error::SinkError;
use threadloom_ingest::ArticleSink;
use tokio_postgres::{Client, NoTls, Row};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::schema::{self, ARTICLES_TABLE, CHANNELS_TABLE, EXPORT_JOBS_TABLE, THREADS_TABLE};

/// The only state a persisted thread ever reaches: a thread row exists
/// solely to anchor the article that resolved it.
const THREAD_STATE_RESOLVED: &str = "resolved";

pub struct PgStore {
    client: Arc<tokio::sync::Mutex<Client>>,
    embeddings: Option<Arc<dyn Embeddings>>,
}

impl PgStore {
    pub async fn connect(connection_string: &str) -> Result<Self> {
        Self::connect_with_embeddings(connection_string, None).await
    }

    pub async fn connect_with_embeddings(
        connection_string: &str,
        embeddings: Option<Arc<dyn Embeddings>>,
    ) -> Result<Self> {
        let (client, connection) = tokio_postgres::connect(connection_string, NoTls)
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "postgres_connection_error");
            }
        });

        schema::ensure_schema(&client).await?;

        Ok(PgStore {
            client: Arc::new(tokio::sync::Mutex::new(client)),
            embeddings,
        })
    }

    /// Resolves `(scope, external_id)` to a stable channel UUID, minting
    /// one on first sight. This is the only path that creates a channel
    /// id — a caller that already holds an internal UUID from some other
    /// source has no corresponding lookup here and must use
    /// [`PgStore::require_channel`] instead.
    pub async fn resolve_or_create_channel(
        &self,
        source_type: SourceType,
        scope: &str,
        external_id: &str,
    ) -> Result<Uuid> {
        let client = self.client.lock().await;
        let id = Uuid::new_v4();
        let row = client
            .query_one(
                &format!(
                    "INSERT INTO {CHANNELS_TABLE} (id, source_type, scope, external_id)
                     VALUES ($1, $2, $3, $4)
                     ON CONFLICT (scope, external_id)
                     DO UPDATE SET source_type = EXCLUDED.source_type
                     RETURNING id"
                ),
                &[&id, &source_type.as_str(), &scope, &external_id],
            )
            .await?;
        Ok(row.get("id"))
    }

    /// Looks up a channel that must already exist. Used for the hard-error
    /// path when a payload names an internal UUID directly.
    pub async fn require_channel(&self, channel_id: Uuid) -> Result<()> {
        let client = self.client.lock().await;
        let row = client
            .query_opt(&format!("SELECT id FROM {CHANNELS_TABLE} WHERE id = $1"), &[&channel_id])
            .await?;
        row.map(|_| ()).ok_or(Error::UnknownChannel(channel_id))
    }

    pub async fn create_export_job(&self, source_scope: &str, format: &str) -> Result<ExportJob> {
        let job = ExportJob {
            id: Uuid::new_v4(),
            source_scope: source_scope.to_string(),
            format: format.to_string(),
            state: ExportState::Pending,
            record_count: 0,
            file_path: None,
            content_hash: None,
            manifest_hash: None,
            consent_verified: false,
            file_size_bytes: None,
            c2pa_manifest_hash: None,
        };
        let client = self.client.lock().await;
        client
            .execute(
                &format!(
                    "INSERT INTO {EXPORT_JOBS_TABLE}
                        (id, source_scope, format, state, record_count, consent_verified)
                     VALUES ($1, $2, $3, $4, $5, $6)"
                ),
                &[
                    &job.id,
                    &job.source_scope,
                    &job.format,
                    &export_state_str(job.state),
                    &(job.record_count as i64),
                    &job.consent_verified,
                ],
            )
            .await?;
        Ok(job)
    }

    pub async fn complete_export_job(
        &self,
        job_id: Uuid,
        record_count: u64,
        file_path: &str,
        content_hash: &str,
        manifest_hash: &str,
        file_size_bytes: u64,
    ) -> Result<()> {
        let client = self.client.lock().await;
        client
            .execute(
                &format!(
                    "UPDATE {EXPORT_JOBS_TABLE}
                     SET state = $2, record_count = $3, file_path = $4, content_hash = $5,
                         manifest_hash = $6, file_size_bytes = $7, consent_verified = TRUE
                     WHERE id = $1"
                ),
                &[
                    &job_id,
                    &export_state_str(ExportState::Complete),
                    &(record_count as i64),
                    &file_path,
                    &content_hash,
                    &manifest_hash,
                    &(file_size_bytes as i64),
                ],
            )
            .await?;
        Ok(())
    }

    pub async fn fail_export_job(&self, job_id: Uuid) -> Result<()> {
        let client = self.client.lock().await;
        client
            .execute(
                &format!("UPDATE {EXPORT_JOBS_TABLE} SET state = $2 WHERE id = $1"),
                &[&job_id, &export_state_str(ExportState::Failed)],
            )
            .await?;
        Ok(())
    }

    /// Visible articles for a given scope at or above `min_quality`,
    /// optionally restricted to one `language`, oldest first (stable
    /// export ordering). Returns each row alongside the channel's
    /// `source_type`, since the export record's `source` field is
    /// `"<type>:<scope>"`. `language` is a JSONB field inside `article`
    /// rather than its own column, so it is filtered in Rust after
    /// decoding rather than pushed into the SQL `WHERE` clause.
    pub async fn fetch_exportable_articles(
        &self,
        scope: &str,
        min_quality: f64,
        language: Option<&str>,
    ) -> Result<Vec<(SourceType, StoredArticle)>> {
        let client = self.client.lock().await;
        let rows = client
            .query(
                &format!(
                    "SELECT a.id, a.thread_id, a.article, a.quality_score, a.is_visible,
                            a.source_url, a.created_at, a.updated_at, c.source_type
                     FROM {ARTICLES_TABLE} a
                     JOIN {CHANNELS_TABLE} c ON c.id = a.channel_id
                     WHERE c.scope = $1 AND a.is_visible = TRUE AND a.quality_score >= $2
                     ORDER BY a.created_at ASC"
                ),
                &[&scope, &min_quality],
            )
            .await?;
        rows.iter()
            .map(|row| {
                let source_type = source_type_from_str(row.get("source_type"))?;
                Ok((source_type, row_to_stored_article(row)?))
            })
            .collect::<Result<Vec<_>>>()
            .map(|articles| match language {
                Some(lang) => articles.into_iter().filter(|(_, a)| a.article.language == lang).collect(),
                None => articles,
            })
    }
}

fn source_type_from_str(s: &str) -> Result<SourceType> {
    match s {
        "discord" => Ok(SourceType::Discord),
        "github" => Ok(SourceType::Github),
        other => Err(Error::Corrupt(format!("unknown source_type {other:?} in channels row"))),
    }
}

fn export_state_str(state: ExportState) -> &'static str {
    match state {
        ExportState::Pending => "pending",
        ExportState::Complete => "complete",
        ExportState::Failed => "failed",
    }
}

fn row_to_stored_article(row: &Row) -> Result<StoredArticle> {
    let article_json: serde_json::Value = row.get("article");
    let article: CompiledArticle = serde_json::from_value(article_json)?;
    Ok(StoredArticle {
        id: row.get("id"),
        thread_id: row.get("thread_id"),
        article,
        embedding: None,
        quality_score: row.get("quality_score"),
        is_visible: row.get("is_visible"),
        source_url: row.get("source_url"),
        created_at: row.get::<_, DateTime<Utc>>("created_at"),
        updated_at: row.get::<_, DateTime<Utc>>("updated_at"),
    })
}

#[async_trait]
impl ArticleSink for PgStore {
    async fn store(
        &self,
        article: CompiledArticle,
        quality_score: f64,
        source_type: SourceType,
        source_scope: &str,
        channel_scope: &str,
    ) -> std::result::Result<(), SinkError> {
        let store_inner = async {
            let channel_id = self
                .resolve_or_create_channel(source_type, source_scope, channel_scope)
                .await?;

            let embedding_text = format!("{} {} {}", article.thread_summary, article.symptom, article.solution);
            let embedding = match &self.embeddings {
                Some(provider) => provider.encode(&embedding_text).await.ok(),
                None => None,
            };

            let article_json = serde_json::to_value(&article)?;
            let client = self.client.lock().await;

            let thread_id = Uuid::new_v4();
            client
                .execute(
                    &format!(
                        "INSERT INTO {THREADS_TABLE} (id, channel_id, state, resolved_at)
                         VALUES ($1, $2, $3, now())"
                    ),
                    &[&thread_id, &channel_id, &THREAD_STATE_RESOLVED],
                )
                .await?;

            client
                .execute(
                    &format!(
                        "INSERT INTO {ARTICLES_TABLE}
                            (thread_id, channel_id, article, embedding, quality_score, is_visible, source_url)
                         VALUES ($1, $2, $3, $4, $5, TRUE, $6)"
                    ),
                    &[
                        &thread_id,
                        &channel_id,
                        &article_json,
                        &embedding.map(pgvector::Vector::from),
                        &quality_score,
                        &article.source_url,
                    ],
                )
                .await?;
            Ok::<_, Error>(())
        };

        store_inner.await.map_err(|e| Box::new(e) as SinkError)
    }
}
