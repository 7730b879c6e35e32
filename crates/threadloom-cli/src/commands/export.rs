//! `threadloom export <scope>`: packages visible articles for a scope
//! as a signed JSONL dataset. An operational convenience beyond the
//! documented `fetch` surface — there is no CLI contract to honor here,
//! so failures just print and return a non-zero exit code.

use std::path::PathBuf;

use clap::Args;
use threadloom_core::QUALITY_THRESHOLD;
use threadloom_export::package;
use threadloom_store::PgStore;

use crate::output::{print_error, print_info, print_success};

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Server id (Discord) or "owner/repo" (GitHub) to export.
    scope: String,

    /// Minimum quality score to include.
    #[arg(long, default_value_t = QUALITY_THRESHOLD)]
    min_quality: f64,

    /// Restrict to one article language.
    #[arg(long)]
    language: Option<String>,

    /// Directory to write the two export artifacts into.
    #[arg(long, env = "EXPORT_DIR", default_value = "/tmp/threadloom_exports")]
    export_dir: PathBuf,
}

pub async fn run(args: ExportArgs) -> i32 {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        print_error("DATABASE_URL is not set");
        return 2;
    };

    let store = match PgStore::connect(&database_url).await {
        Ok(store) => store,
        Err(e) => {
            print_error(&format!("failed to connect to the article store: {e}"));
            return 1;
        }
    };

    let job = match store.create_export_job(&args.scope, "jsonl").await {
        Ok(job) => job,
        Err(e) => {
            print_error(&format!("failed to create export job record: {e}"));
            return 1;
        }
    };

    print_info(&format!("exporting scope {:?} at or above quality {}...", args.scope, args.min_quality));

    let articles = match store
        .fetch_exportable_articles(&args.scope, args.min_quality, args.language.as_deref())
        .await
    {
        Ok(articles) => articles,
        Err(e) => {
            print_error(&format!("failed to query articles: {e}"));
            let _ = store.fail_export_job(job.id).await;
            return 1;
        }
    };

    let packaged = match package(&args.export_dir, job.id, &args.scope, &articles) {
        Ok(packaged) => packaged,
        Err(e) => {
            print_error(&format!("packaging failed: {e}"));
            let _ = store.fail_export_job(job.id).await;
            return 1;
        }
    };

    if let Err(e) = store
        .complete_export_job(
            job.id,
            packaged.record_count as u64,
            &packaged.jsonl_path.display().to_string(),
            &packaged.content_hash,
            &packaged.manifest_hash,
            packaged.file_size_bytes,
        )
        .await
    {
        print_error(&format!("export succeeded but failed to record it: {e}"));
        return 1;
    }

    print_success(&format!(
        "wrote {} records to {} ({})",
        packaged.record_count,
        packaged.jsonl_path.display(),
        packaged.content_hash
    ));
    0
}
