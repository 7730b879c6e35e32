use std::collections::HashMap;
use std::sync::Arc;

use threadloom_embeddings::Embeddings;
use threadloom_graph::{CompiledGraph, StateGraph, END};
use threadloom_llm::{Classifier, Compiler, Evaluator};

use crate::nodes::{
    route_after_classification, route_after_evaluation, route_after_quality, CompilerNode,
    DisentangleNode, EvaluatorNode, QualityGateNode, RouterNode,
};
use crate::state::AgentState;

/// Wires the extraction pipeline:
///
/// ```text
/// disentangle -> router -> [NOISE -> END | article type -> evaluator]
///             evaluator -> [gate passes -> compiler | else -> END (suspend)]
///             compiler -> quality_gate -> [score >= threshold -> END
///                                          | retries remain -> compiler
///                                          | else -> END (reject)]
/// ```
pub fn build_graph(
    embeddings: Arc<dyn Embeddings>,
    classifier: Arc<dyn Classifier>,
    evaluator: Arc<dyn Evaluator>,
    compiler: Arc<dyn Compiler>,
) -> threadloom_graph::Result<CompiledGraph<AgentState>> {
    let mut graph = StateGraph::new();

    graph.add_node(Arc::new(DisentangleNode::new(embeddings)));
    graph.add_node(Arc::new(RouterNode::new(classifier)));
    graph.add_node(Arc::new(EvaluatorNode::new(evaluator)));
    graph.add_node(Arc::new(CompilerNode::new(compiler)));
    graph.add_node(Arc::new(QualityGateNode));

    graph.set_entry_point("disentangle");
    graph.add_edge("disentangle", "router");

    let mut after_classification = HashMap::new();
    after_classification.insert("evaluator".to_string(), "evaluator".to_string());
    after_classification.insert(END.to_string(), END.to_string());
    graph.add_conditional_edges("router", route_after_classification, after_classification);

    let mut after_evaluation = HashMap::new();
    after_evaluation.insert("compiler".to_string(), "compiler".to_string());
    after_evaluation.insert(END.to_string(), END.to_string());
    graph.add_conditional_edges("evaluator", route_after_evaluation, after_evaluation);

    let mut after_quality = HashMap::new();
    after_quality.insert("compiler".to_string(), "compiler".to_string());
    after_quality.insert(END.to_string(), END.to_string());
    graph.add_conditional_edges("quality_gate", route_after_quality, after_quality);

    graph.add_edge("compiler", "quality_gate");

    graph.compile()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use threadloom_core::{Classification, Evaluation, RawMessage, SourceType};
    use threadloom_embeddings::DeterministicEmbeddings;
    use threadloom_llm::{FixedClassifier, FixedCompiler, FixedEvaluator};

    fn msg(id: &str) -> RawMessage {
        RawMessage {
            message_id: id.into(),
            author_handle: "a".into(),
            content: "how do I fix this error".into(),
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            reply_to: None,
            mentions: vec![],
            has_code: false,
            source_type: SourceType::Discord,
        }
    }

    #[tokio::test]
    async fn noise_short_circuits_to_end_without_evaluator() {
        let graph = build_graph(
            Arc::new(DeterministicEmbeddings::new()),
            Arc::new(FixedClassifier(Classification::Noise)),
            Arc::new(FixedEvaluator(Evaluation::all_false("unused"))),
            Arc::new(FixedCompiler(None)),
        )
        .unwrap();

        let state = AgentState::new(vec![msg("1")], SourceType::Discord, "s", "c");
        let outcome = graph.invoke(state).await.unwrap();

        assert!(!outcome.nodes_executed.contains(&"evaluator".to_string()));
        assert_eq!(outcome.final_state.classification, Some(Classification::Noise));
    }

    #[tokio::test]
    async fn full_pipeline_reaches_compiler_on_strong_signal() {
        let article = threadloom_core::CompiledArticle {
            article_type: Classification::Troubleshooting,
            symptom: "s".into(),
            diagnosis: "d".into(),
            solution: "x".repeat(250),
            code_snippet: Some("c".repeat(100)),
            language: "rust".into(),
            framework: None,
            tags: vec!["a".into(), "b".into(), "c".into(), "d".into(), "e".into()],
            confidence: 0.9,
            thread_summary: "a meaningful summary".into(),
            source_url: None,
        };

        let graph = build_graph(
            Arc::new(DeterministicEmbeddings::new()),
            Arc::new(FixedClassifier(Classification::Troubleshooting)),
            Arc::new(FixedEvaluator(Evaluation::new(true, true, true, "r".into()))),
            Arc::new(FixedCompiler(Some(article))),
        )
        .unwrap();

        let state = AgentState::new(vec![msg("1")], SourceType::Discord, "s", "c");
        let outcome = graph.invoke(state).await.unwrap();

        assert!(outcome.nodes_executed.contains(&"compiler".to_string()));
        assert!(outcome.final_state.quality_score >= threadloom_core::QUALITY_THRESHOLD);
    }

    #[tokio::test]
    async fn weak_evaluation_suspends_before_compiler() {
        let graph = build_graph(
            Arc::new(DeterministicEmbeddings::new()),
            Arc::new(FixedClassifier(Classification::Troubleshooting)),
            Arc::new(FixedEvaluator(Evaluation::all_false("nothing here"))),
            Arc::new(FixedCompiler(None)),
        )
        .unwrap();

        let state = AgentState::new(vec![msg("1")], SourceType::Discord, "s", "c");
        let outcome = graph.invoke(state).await.unwrap();

        assert!(!outcome.nodes_executed.contains(&"compiler".to_string()));
        assert_eq!(outcome.final_state.compiled_article, None);
    }
}
