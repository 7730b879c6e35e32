//! Postgres-backed [`ConsentRegistry`]: resolves ingestion consent against
//! `consent_records`, keyed by `(source_scope, author_handle)`. Fails
//! closed on any backend error, per the trait's contract — a query error
//! here must never be mistaken for "everyone consented".

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use threadloom_consent::ConsentRegistry;
use tokio_postgres::{Client, NoTls};

use crate::error::{Error, Result};
use crate::schema::CONSENT_RECORDS_TABLE;

pub struct PgConsentRegistry {
    client: Arc<tokio::sync::Mutex<Client>>,
}

impl PgConsentRegistry {
    pub async fn connect(connection_string: &str) -> Result<Self> {
        let (client, connection) = tokio_postgres::connect(connection_string, NoTls)
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "postgres_connection_error");
            }
        });

        crate::schema::ensure_schema(&client).await?;

        Ok(PgConsentRegistry {
            client: Arc::new(tokio::sync::Mutex::new(client)),
        })
    }

    async fn query_consented(&self, source_scope: &str) -> Result<HashSet<String>> {
        let client = self.client.lock().await;
        let rows = client
            .query(
                &format!(
                    "SELECT author_handle FROM {CONSENT_RECORDS_TABLE}
                     WHERE source_scope = $1 AND granted = TRUE AND revoked_at IS NULL"
                ),
                &[&source_scope],
            )
            .await?;
        Ok(rows.iter().map(|row| row.get("author_handle")).collect())
    }
}

#[async_trait]
impl ConsentRegistry for PgConsentRegistry {
    async fn consented_authors(&self, source_scope: &str) -> HashSet<String> {
        match self.query_consented(source_scope).await {
            Ok(authors) => authors,
            Err(e) => {
                tracing::error!(error = %e, source_scope, "consent_query_failed");
                HashSet::new()
            }
        }
    }
}
