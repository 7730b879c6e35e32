use std::sync::Arc;

use async_trait::async_trait;
use threadloom_core::Classification;
use threadloom_disentangle::cluster;
use threadloom_embeddings::Embeddings;
use threadloom_graph::{Node, NodeError};
use threadloom_llm::{Classifier, Compiler, Evaluator};

use crate::quality;
use crate::state::AgentState;

/// Pre-processing node: cluster raw messages into logical threads, or
/// preserve the input verbatim when `skip_disentangle` is set (pre-
/// threaded forum batches).
pub struct DisentangleNode {
    embeddings: Arc<dyn Embeddings>,
}

impl DisentangleNode {
    pub fn new(embeddings: Arc<dyn Embeddings>) -> Self {
        DisentangleNode { embeddings }
    }
}

#[async_trait]
impl Node<AgentState> for DisentangleNode {
    async fn execute(&self, mut state: AgentState) -> Result<AgentState, NodeError> {
        if state.skip_disentangle {
            state.threads = vec![state.messages.clone()];
            state.current_thread_idx = 0;
            return Ok(state);
        }

        let mut threads = cluster(self.embeddings.as_ref(), state.messages.clone()).await;

        threads.retain(|t| t.len() >= 2);
        if threads.is_empty() && !state.messages.is_empty() {
            threads = vec![state.messages.clone()];
        }
        threads.sort_by_key(|t| std::cmp::Reverse(t.len()));

        state.threads = threads;
        state.current_thread_idx = 0;
        Ok(state)
    }

    fn name(&self) -> &str {
        "disentangle"
    }
}

/// Classifies the current thread and sets `article_type` (empty / `None`
/// when NOISE).
pub struct RouterNode {
    classifier: Arc<dyn Classifier>,
}

impl RouterNode {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        RouterNode { classifier }
    }
}

#[async_trait]
impl Node<AgentState> for RouterNode {
    async fn execute(&self, mut state: AgentState) -> Result<AgentState, NodeError> {
        let thread = state.current_thread().unwrap_or(&[]).to_vec();
        let classification = self.classifier.classify(&thread).await;
        state.article_type = classification.is_article_type().then_some(classification);
        state.classification = Some(classification);
        Ok(state)
    }

    fn name(&self) -> &str {
        "router"
    }
}

pub fn route_after_classification(state: &AgentState) -> String {
    match state.classification {
        Some(Classification::Noise) | None => threadloom_graph::END.to_string(),
        Some(_) => "evaluator".to_string(),
    }
}

/// Assesses whether the current thread has enough substance to compile.
pub struct EvaluatorNode {
    evaluator: Arc<dyn Evaluator>,
}

impl EvaluatorNode {
    pub fn new(evaluator: Arc<dyn Evaluator>) -> Self {
        EvaluatorNode { evaluator }
    }
}

#[async_trait]
impl Node<AgentState> for EvaluatorNode {
    async fn execute(&self, mut state: AgentState) -> Result<AgentState, NodeError> {
        let thread = state.current_thread().unwrap_or(&[]).to_vec();
        state.evaluation = Some(self.evaluator.evaluate(&thread).await);
        Ok(state)
    }

    fn name(&self) -> &str {
        "evaluator"
    }
}

/// Type-aware gate deciding whether the evaluated thread proceeds to the
/// compiler or the run suspends (checkpoint preserved, exit).
pub fn route_after_evaluation(state: &AgentState) -> String {
    let Some(evaluation) = &state.evaluation else {
        return threadloom_graph::END.to_string();
    };
    let article_type = state.article_type.unwrap_or(Classification::Troubleshooting);

    let proceed = match article_type {
        Classification::Guide | Classification::DiscussionSummary => true,
        Classification::QuestionAnswer => evaluation.has_solution,
        Classification::Troubleshooting => {
            (evaluation.is_resolved && evaluation.has_code)
                || (evaluation.has_solution && evaluation.has_code)
                || (evaluation.has_solution && evaluation.is_resolved)
        }
        Classification::Noise => false,
    };

    if proceed {
        "compiler".to_string()
    } else {
        threadloom_graph::END.to_string()
    }
}

/// Produces a compiled article, or leaves it `None` on provider failure.
pub struct CompilerNode {
    compiler: Arc<dyn Compiler>,
}

impl CompilerNode {
    pub fn new(compiler: Arc<dyn Compiler>) -> Self {
        CompilerNode { compiler }
    }
}

#[async_trait]
impl Node<AgentState> for CompilerNode {
    async fn execute(&self, mut state: AgentState) -> Result<AgentState, NodeError> {
        let thread = state.current_thread().unwrap_or(&[]).to_vec();
        let article_type = state.article_type.unwrap_or(Classification::Troubleshooting);
        state.compiled_article = self.compiler.compile(&thread, article_type).await;
        Ok(state)
    }

    fn name(&self) -> &str {
        "compiler"
    }
}

/// Scores the compiled article and advances the retry counter.
pub struct QualityGateNode;

#[async_trait]
impl Node<AgentState> for QualityGateNode {
    async fn execute(&self, mut state: AgentState) -> Result<AgentState, NodeError> {
        let score = quality::score(state.compiled_article.as_ref());
        let report = quality::advance(score, state.retry_count);

        if report.score >= threadloom_core::QUALITY_THRESHOLD {
            tracing::info!(score = report.score, "quality_gate_pass");
        } else {
            tracing::warn!(
                score = report.score,
                retry = report.retries_used,
                max_retries = threadloom_core::MAX_RETRIES,
                "quality_gate_fail"
            );
        }

        state.quality_score = report.score;
        state.retry_count = report.retries_used;
        Ok(state)
    }

    fn name(&self) -> &str {
        "quality_gate"
    }
}

pub fn route_after_quality(state: &AgentState) -> String {
    if state.quality_score >= threadloom_core::QUALITY_THRESHOLD {
        return threadloom_graph::END.to_string();
    }
    if state.retry_count < threadloom_core::MAX_RETRIES {
        return "compiler".to_string();
    }
    tracing::error!(
        score = state.quality_score,
        retries = state.retry_count,
        "quality_gate_rejected"
    );
    threadloom_graph::END.to_string()
}
