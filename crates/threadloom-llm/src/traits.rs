use async_trait::async_trait;
use threadloom_core::{Classification, CompiledArticle, Evaluation, RawMessage};

/// Classifies a thread into one of the closed [`Classification`] labels.
/// Ambiguous or malformed provider output must fall back to
/// `QUESTION_ANSWER` inside the implementation, never propagate an error —
/// classification failure is not a pipeline failure.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, thread: &[RawMessage]) -> Classification;
}

/// Assesses whether a thread has enough substance to compile. A provider
/// failure or unparsable response must degrade to
/// [`Evaluation::all_false`], never propagate.
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(&self, thread: &[RawMessage]) -> Evaluation;
}

/// Extracts structured knowledge from a thread. A provider failure
/// returns `None` rather than propagating — the quality gate will then
/// score a `None` article as zero and the run proceeds to the retry/reject
/// path.
#[async_trait]
pub trait Compiler: Send + Sync {
    async fn compile(
        &self,
        thread: &[RawMessage],
        article_type: Classification,
    ) -> Option<CompiledArticle>;
}

/// Renders a thread the way every node-level prompt expects it: one line
/// per message, `[timestamp] author_prefix: content`.
pub fn format_thread(thread: &[RawMessage]) -> String {
    thread
        .iter()
        .map(|m| {
            let author_prefix: String = m.author_handle.chars().take(8).collect();
            format!("[{}] {}: {}", m.timestamp.to_rfc3339(), author_prefix, m.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Extracts the first top-level `{...}` substring from provider output
/// that may be wrapped in code fences or preceded by commentary.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end > start {
        Some(&text[start..=end])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_json_object_strips_code_fences() {
        let text = "```json\n{\"a\": 1}\n```";
        assert_eq!(extract_json_object(text), Some("{\"a\": 1}"));
    }

    #[test]
    fn extract_json_object_none_when_no_braces() {
        assert_eq!(extract_json_object("no json here"), None);
    }
}
