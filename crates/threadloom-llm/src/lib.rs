//! Classifier / evaluator / compiler behaviors as interfaces, with an
//! Anthropic-backed production implementation and deterministic test
//! doubles. Modeled as traits rather than a base class so distinct
//! implementations can be injected for testing and production.

pub mod anthropic;
pub mod error;
pub mod stub;
pub mod traits;

pub use anthropic::AnthropicLlm;
pub use error::{Error, Result};
pub use stub::{FixedClassifier, FixedCompiler, FixedEvaluator};
pub use traits::{format_thread, Classifier, Compiler, Evaluator};
