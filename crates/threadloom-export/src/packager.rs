//! Selects visible articles for a scope and packages them as a dataset:
//! one newline-delimited JSON record per article plus a signed
//! provenance manifest, written as two sibling files.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::json;
use threadloom_core::{SourceType, StoredArticle};

use crate::error::{Error, Result};
use crate::manifest::{self, Manifest};

#[derive(Debug, Clone, Serialize)]
struct ExportRecord {
    id: String,
    source: String,
    knowledge: serde_json::Value,
    metadata: serde_json::Value,
}

fn to_record(source_type: SourceType, scope: &str, article: &StoredArticle) -> ExportRecord {
    let a = &article.article;
    ExportRecord {
        id: format!("art_{}", article.id),
        source: format!("{}:{}", source_type.as_str(), scope),
        knowledge: json!({
            "symptom": a.symptom,
            "diagnosis": a.diagnosis,
            "solution": a.solution,
            "code_snippet": a.code_snippet,
            "language": a.language,
            "framework": a.framework,
            "tags": a.tags,
            "confidence": a.confidence,
            "thread_summary": a.thread_summary,
        }),
        metadata: json!({
            "quality_score": article.quality_score,
            "created_at": article.created_at.to_rfc3339(),
        }),
    }
}

/// Builds the LF-separated, no-trailing-newline JSONL body for a batch
/// of articles. Caller is responsible for filtering (scope, quality,
/// language) before calling this.
pub fn build_jsonl(articles: &[(SourceType, StoredArticle)], scope: &str) -> Result<String> {
    let mut lines = Vec::with_capacity(articles.len());
    for (source_type, article) in articles {
        let record = to_record(*source_type, scope, article);
        lines.push(serde_json::to_string(&record)?);
    }
    Ok(lines.join("\n"))
}

pub struct PackagedExport {
    pub jsonl_path: PathBuf,
    pub manifest_path: PathBuf,
    pub record_count: usize,
    pub content_hash: String,
    pub manifest_hash: String,
    pub file_size_bytes: u64,
}

/// Writes `export_<id>.jsonl` and `export_<id>.c2pa.json` under
/// `export_dir`, creating it if needed. Returns an error rather than an
/// empty dataset if `articles` is empty — callers decide whether that's
/// a hard failure or a no-op.
pub fn package(
    export_dir: &Path,
    export_id: impl std::fmt::Display,
    source_scope: &str,
    articles: &[(SourceType, StoredArticle)],
) -> Result<PackagedExport> {
    if articles.is_empty() {
        return Err(Error::NoArticles);
    }

    std::fs::create_dir_all(export_dir).map_err(|e| io_err(export_dir, e))?;

    let body = build_jsonl(articles, source_scope)?;
    let content_bytes = body.into_bytes();
    let content_hash = manifest::compute_content_hash(&content_bytes);

    let jsonl_path = export_dir.join(format!("export_{export_id}.jsonl"));
    std::fs::write(&jsonl_path, &content_bytes).map_err(|e| io_err(&jsonl_path, e))?;

    let source = format!(
        "{}:{}",
        articles[0].0.as_str(),
        source_scope
    );
    let manifest: Manifest = manifest::create_manifest(&export_id, articles.len(), &content_hash, &source);
    let manifest_hash = manifest::sign_manifest(&manifest)?;

    let manifest_path = export_dir.join(format!("export_{export_id}.c2pa.json"));
    let manifest_pretty = serde_json::to_string_pretty(&manifest)?;
    std::fs::write(&manifest_path, &manifest_pretty).map_err(|e| io_err(&manifest_path, e))?;

    tracing::info!(
        scope = source_scope,
        records = articles.len(),
        path = %jsonl_path.display(),
        "export_complete"
    );

    Ok(PackagedExport {
        jsonl_path,
        manifest_path,
        record_count: articles.len(),
        content_hash,
        manifest_hash,
        file_size_bytes: content_bytes.len() as u64,
    })
}

fn io_err(path: &Path, source: std::io::Error) -> Error {
    Error::Io {
        path: path.display().to_string(),
        source,
    }
}
