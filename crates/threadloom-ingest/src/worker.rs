//! Consumes a flushed batch: consent filter (private sources only) ->
//! anonymize -> invoke the extraction graph -> persist a passing article.
//! Persistence retries with backoff since it is the only step that can
//! fail for a transport reason; every pipeline stage upstream of it
//! already degrades internally rather than returning an error.

use std::sync::Arc;

use threadloom_anonymize::anonymize_batch;
use threadloom_consent::ConsentRegistry;
use threadloom_core::{Classification, RawMessage, SourceType, QUALITY_THRESHOLD};
use threadloom_embeddings::Embeddings;
use threadloom_extraction::state::{channel_prefix, derive_thread_id};
use threadloom_extraction::AgentState;
use threadloom_graph::Checkpointer;
use threadloom_llm::{Classifier, Compiler, Evaluator};
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;

use crate::error::{Error, Result};
use crate::sink::ArticleSink;

#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    /// The whole batch was dropped before reaching the graph (no
    /// consented author in a private-source batch).
    SkippedNoConsent { excluded: usize },
    Processed {
        classification: Option<Classification>,
        quality_score: f64,
        stored: bool,
    },
}

/// Wires the providers and sink a batch needs and runs batches one at a
/// time through the pipeline. Cheap to clone: every field is an `Arc`.
pub struct BatchWorkerPool {
    embeddings: Arc<dyn Embeddings>,
    classifier: Arc<dyn Classifier>,
    evaluator: Arc<dyn Evaluator>,
    compiler: Arc<dyn Compiler>,
    checkpointer: Option<Arc<dyn Checkpointer<AgentState>>>,
    consent: Arc<dyn ConsentRegistry>,
    sink: Arc<dyn ArticleSink>,
}

impl BatchWorkerPool {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        embeddings: Arc<dyn Embeddings>,
        classifier: Arc<dyn Classifier>,
        evaluator: Arc<dyn Evaluator>,
        compiler: Arc<dyn Compiler>,
        checkpointer: Option<Arc<dyn Checkpointer<AgentState>>>,
        consent: Arc<dyn ConsentRegistry>,
        sink: Arc<dyn ArticleSink>,
    ) -> Self {
        BatchWorkerPool {
            embeddings,
            classifier,
            evaluator,
            compiler,
            checkpointer,
            consent,
            sink,
        }
    }

    pub async fn process_batch(
        &self,
        source_scope: &str,
        channel_scope: &str,
        source_type: SourceType,
        mut messages: Vec<RawMessage>,
    ) -> Result<BatchOutcome> {
        if source_type.is_private() {
            let (kept, excluded) = threadloom_consent::filter(self.consent.as_ref(), messages, source_scope).await;
            if excluded > 0 {
                tracing::info!(channel = channel_scope, excluded, "consent_filtered");
            }
            if kept.is_empty() {
                return Ok(BatchOutcome::SkippedNoConsent { excluded });
            }
            messages = kept;
        }

        tracing::info!(channel = channel_scope, count = messages.len(), "batch_dispatched");

        let texts: Vec<String> = messages.iter().map(|m| m.content.clone()).collect();
        for (message, redacted) in messages.iter_mut().zip(anonymize_batch(&texts)) {
            message.content = redacted.text;
        }

        let state = AgentState::new(messages, source_type, source_scope, channel_scope);

        // A thread_id minted fresh from the current batch's wall clock can
        // never match a prior suspended checkpoint's key, so a pending
        // thread for this channel is looked up first; only a channel with
        // no open thread gets a newly minted id.
        let prefix = channel_prefix(source_type, channel_scope);
        let thread_id = match &self.checkpointer {
            Some(checkpointer) => match checkpointer.find_by_prefix(&prefix).await? {
                Some(existing) => existing,
                None => derive_thread_id(source_type, channel_scope, state.batch_creation_time.unwrap_or_else(chrono::Utc::now)),
            },
            None => derive_thread_id(source_type, channel_scope, state.batch_creation_time.unwrap_or_else(chrono::Utc::now)),
        };

        let mut graph = threadloom_extraction::build_graph(
            self.embeddings.clone(),
            self.classifier.clone(),
            self.evaluator.clone(),
            self.compiler.clone(),
        )?;
        if let Some(checkpointer) = &self.checkpointer {
            graph = graph.with_checkpointer(checkpointer.clone()).with_thread_id(thread_id.clone());
        }

        let outcome = graph.invoke(state).await?;

        // The extraction graph never configures a true interrupt, so
        // `suspended_at` is always `None`: the evaluator's "not enough yet"
        // verdict routes straight to END rather than pausing mid-run. The
        // only state that should keep this thread_id's checkpoint alive is
        // exactly that verdict — evaluated, but never reached the compiler
        // (retry_count untouched) — everything else (NOISE, a compiled
        // article, or a quality-gate rejection after exhausting retries) is
        // a terminal outcome for this thread.
        let awaiting_more_messages = outcome.final_state.evaluation.is_some()
            && outcome.final_state.compiled_article.is_none()
            && outcome.final_state.retry_count == 0;
        if !awaiting_more_messages {
            if let Some(checkpointer) = &self.checkpointer {
                checkpointer.delete(&thread_id).await?;
            }
        }
        let final_state = outcome.final_state;

        let stored = if final_state.quality_score >= QUALITY_THRESHOLD {
            tracing::info!(channel = channel_scope, score = final_state.quality_score, "quality_gate_pass");
            if let Some(article) = final_state.compiled_article {
                self.persist_with_retry(article, final_state.quality_score, source_type, source_scope, channel_scope)
                    .await?;
                tracing::info!(channel = channel_scope, "article_stored");
                true
            } else {
                false
            }
        } else {
            tracing::info!(channel = channel_scope, score = final_state.quality_score, "quality_gate_fail");
            false
        };

        Ok(BatchOutcome::Processed {
            classification: final_state.classification,
            quality_score: final_state.quality_score,
            stored,
        })
    }

    async fn persist_with_retry(
        &self,
        article: threadloom_core::CompiledArticle,
        quality_score: f64,
        source_type: SourceType,
        source_scope: &str,
        channel_scope: &str,
    ) -> Result<()> {
        let strategy = ExponentialBackoff::from_millis(200).map(jitter).take(3);
        Retry::spawn(strategy, || {
            let article = article.clone();
            async move {
                self.sink
                    .store(article, quality_score, source_type, source_scope, channel_scope)
                    .await
            }
        })
        .await
        .map_err(Error::SinkExhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use chrono::{TimeZone, Utc};
    use threadloom_core::CompiledArticle;
    use threadloom_embeddings::DeterministicEmbeddings;
    use threadloom_graph::MemoryCheckpointer;
    use threadloom_llm::{Compiler, FixedClassifier, FixedEvaluator};

    fn msg(id: &str, secs: i64) -> RawMessage {
        RawMessage {
            message_id: id.into(),
            author_handle: "a".into(),
            content: "how do I fix this".into(),
            timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
            reply_to: None,
            mentions: vec![],
            has_code: false,
            source_type: SourceType::Github,
        }
    }

    fn article() -> CompiledArticle {
        CompiledArticle {
            article_type: Classification::Troubleshooting,
            symptom: "s".into(),
            diagnosis: "d".into(),
            solution: "x".repeat(250),
            code_snippet: Some("c".repeat(100)),
            language: "rust".into(),
            framework: None,
            tags: vec!["a".into(), "b".into(), "c".into(), "d".into(), "e".into()],
            confidence: 0.9,
            thread_summary: "summary".into(),
            source_url: None,
        }
    }

    struct NoopConsent;

    #[async_trait::async_trait]
    impl ConsentRegistry for NoopConsent {
        async fn consented_authors(&self, _source_scope: &str) -> HashSet<String> {
            HashSet::new()
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        stored: Mutex<Vec<CompiledArticle>>,
    }

    #[async_trait::async_trait]
    impl ArticleSink for RecordingSink {
        async fn store(
            &self,
            article: CompiledArticle,
            _quality_score: f64,
            _source_type: SourceType,
            _source_scope: &str,
            _channel_scope: &str,
        ) -> std::result::Result<(), crate::error::SinkError> {
            self.stored.lock().unwrap().push(article);
            Ok(())
        }
    }

    /// Records the length of the thread it was last asked to compile, so
    /// tests can confirm a resumed run merged prior messages in before
    /// reaching the compiler.
    struct RecordingCompiler {
        last_thread_len: AtomicUsize,
        article: Option<CompiledArticle>,
    }

    #[async_trait::async_trait]
    impl Compiler for RecordingCompiler {
        async fn compile(&self, thread: &[RawMessage], _article_type: Classification) -> Option<CompiledArticle> {
            self.last_thread_len.store(thread.len(), Ordering::SeqCst);
            self.article.clone()
        }
    }

    #[tokio::test]
    async fn second_batch_resumes_and_merges_the_first_suspended_thread() {
        let checkpointer: Arc<dyn Checkpointer<AgentState>> = Arc::new(MemoryCheckpointer::new());
        let compiler = Arc::new(RecordingCompiler {
            last_thread_len: AtomicUsize::new(0),
            article: Some(article()),
        });

        let weak_pool = BatchWorkerPool::new(
            Arc::new(DeterministicEmbeddings::new()),
            Arc::new(FixedClassifier(Classification::Troubleshooting)),
            Arc::new(FixedEvaluator(threadloom_core::Evaluation::all_false("not yet"))),
            compiler.clone(),
            Some(checkpointer.clone()),
            Arc::new(NoopConsent),
            Arc::new(RecordingSink::default()),
        );

        let first = weak_pool
            .process_batch("owner/repo", "general", SourceType::Github, vec![msg("1", 1_700_000_000)])
            .await
            .unwrap();
        match first {
            BatchOutcome::Processed { stored, quality_score, .. } => {
                assert!(!stored);
                assert_eq!(quality_score, 0.0);
            }
            other => panic!("expected Processed, got {other:?}"),
        }
        assert!(checkpointer.find_by_prefix("github:general:").await.unwrap().is_some());

        let strong_pool = BatchWorkerPool::new(
            Arc::new(DeterministicEmbeddings::new()),
            Arc::new(FixedClassifier(Classification::Troubleshooting)),
            Arc::new(FixedEvaluator(threadloom_core::Evaluation::new(true, true, true, "resolved".into()))),
            compiler.clone(),
            Some(checkpointer.clone()),
            Arc::new(NoopConsent),
            Arc::new(RecordingSink::default()),
        );

        let second = strong_pool
            .process_batch("owner/repo", "general", SourceType::Github, vec![msg("2", 1_700_000_100)])
            .await
            .unwrap();

        assert_eq!(compiler.last_thread_len.load(Ordering::SeqCst), 2);
        match second {
            BatchOutcome::Processed { stored, .. } => assert!(stored),
            other => panic!("expected Processed, got {other:?}"),
        }
        assert!(checkpointer.find_by_prefix("github:general:").await.unwrap().is_none());
    }
}
