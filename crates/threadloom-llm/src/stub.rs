//! Deterministic test doubles for [`Classifier`], [`Evaluator`], and
//! [`Compiler`] — inject these in tests instead of the network-backed
//! Anthropic client, per the interface/injection design in the workspace
//! design notes.

use async_trait::async_trait;
use threadloom_core::{Classification, CompiledArticle, Evaluation, RawMessage};

use crate::traits::{Classifier, Compiler, Evaluator};

/// Always returns the configured classification.
pub struct FixedClassifier(pub Classification);

#[async_trait]
impl Classifier for FixedClassifier {
    async fn classify(&self, _thread: &[RawMessage]) -> Classification {
        self.0
    }
}

/// Always returns the configured evaluation.
pub struct FixedEvaluator(pub Evaluation);

#[async_trait]
impl Evaluator for FixedEvaluator {
    async fn evaluate(&self, _thread: &[RawMessage]) -> Evaluation {
        self.0
    }
}

/// Always returns the configured article (or `None`), useful for
/// exercising the bounded-retry path with a deliberately weak article.
pub struct FixedCompiler(pub Option<CompiledArticle>);

#[async_trait]
impl Compiler for FixedCompiler {
    async fn compile(
        &self,
        _thread: &[RawMessage],
        _article_type: Classification,
    ) -> Option<CompiledArticle> {
        self.0.clone()
    }
}
