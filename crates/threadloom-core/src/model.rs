use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Platform a [`RawMessage`] originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Discord,
    Github,
}

impl SourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceType::Discord => "discord",
            SourceType::Github => "github",
        }
    }

    /// Private sources are consent-gated; public (forum) sources are not.
    pub fn is_private(self) -> bool {
        matches!(self, SourceType::Discord)
    }
}

/// A single incoming item before threading. Immutable once accepted; the
/// only mutation applied post-construction is PII redaction of `content`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    pub message_id: String,
    pub author_handle: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub reply_to: Option<String>,
    pub mentions: Vec<String>,
    pub has_code: bool,
    pub source_type: SourceType,
}

impl RawMessage {
    /// `has_code` is computed from the presence of fenced code markers.
    pub fn detect_has_code(content: &str) -> bool {
        content.contains("```")
    }
}

/// An ordered, non-empty sequence of [`RawMessage`]s grouped by the
/// disentangler. Carries no identity of its own beyond one pipeline
/// invocation unless the graph checkpoints it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub messages: Vec<RawMessage>,
}

impl Thread {
    /// Builds a thread, enforcing the non-empty and timestamp-ascending
    /// invariants from the data model.
    pub fn new(mut messages: Vec<RawMessage>) -> Result<Self> {
        if messages.is_empty() {
            return Err(Error::InvalidField {
                field: "Thread.messages",
                reason: "thread must contain at least one message".into(),
            });
        }
        messages.sort_by_key(|m| m.timestamp);
        Ok(Thread { messages })
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Closed classification enum. `Noise` is terminal; the other four are
/// article types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    Noise,
    Troubleshooting,
    QuestionAnswer,
    Guide,
    DiscussionSummary,
}

impl Classification {
    pub fn is_article_type(self) -> bool {
        !matches!(self, Classification::Noise)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Classification::Noise => "NOISE",
            Classification::Troubleshooting => "TROUBLESHOOTING",
            Classification::QuestionAnswer => "QUESTION_ANSWER",
            Classification::Guide => "GUIDE",
            Classification::DiscussionSummary => "DISCUSSION_SUMMARY",
        }
    }

    /// Maps a raw classifier label to a known variant, falling back to
    /// `QUESTION_ANSWER` (the broadest useful category) on ambiguity.
    pub fn parse_lenient(label: &str) -> Classification {
        match label.trim().to_uppercase().as_str() {
            "NOISE" => Classification::Noise,
            "TROUBLESHOOTING" => Classification::Troubleshooting,
            "QUESTION_ANSWER" => Classification::QuestionAnswer,
            "GUIDE" => Classification::Guide,
            "DISCUSSION_SUMMARY" => Classification::DiscussionSummary,
            _ => Classification::QuestionAnswer,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Evaluation {
    pub has_solution: bool,
    pub has_code: bool,
    pub is_resolved: bool,
    #[serde(default)]
    pub reasoning: String,
}

impl Evaluation {
    /// `is_resolved` implies `has_solution`; an invalid evaluator output is
    /// coerced rather than rejected, since the evaluator's failure mode is
    /// "all false", never a hard error.
    pub fn new(has_solution: bool, has_code: bool, is_resolved: bool, reasoning: String) -> Self {
        let is_resolved = is_resolved && has_solution;
        Evaluation {
            has_solution,
            has_code,
            is_resolved,
            reasoning,
        }
    }

    pub fn all_false(reasoning: impl Into<String>) -> Self {
        Evaluation {
            has_solution: false,
            has_code: false,
            is_resolved: false,
            reasoning: reasoning.into(),
        }
    }
}

/// Structured extraction produced by the compiler node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledArticle {
    pub article_type: Classification,
    pub symptom: String,
    pub diagnosis: String,
    pub solution: String,
    pub code_snippet: Option<String>,
    pub language: String,
    pub framework: Option<String>,
    pub tags: Vec<String>,
    pub confidence: f64,
    pub thread_summary: String,
    pub source_url: Option<String>,
}

/// Sentinel language value used when an article carries no code snippet.
pub const GENERAL_LANGUAGE: &str = "general";

impl CompiledArticle {
    pub fn validate(&self) -> Result<()> {
        if self.symptom.trim().is_empty() {
            return Err(Error::InvalidField {
                field: "CompiledArticle.symptom",
                reason: "must be non-empty".into(),
            });
        }
        if self.diagnosis.trim().is_empty() {
            return Err(Error::InvalidField {
                field: "CompiledArticle.diagnosis",
                reason: "must be non-empty".into(),
            });
        }
        if self.solution.trim().is_empty() {
            return Err(Error::InvalidField {
                field: "CompiledArticle.solution",
                reason: "must be non-empty".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(Error::InvalidField {
                field: "CompiledArticle.confidence",
                reason: format!("{} is outside [0,1]", self.confidence),
            });
        }
        let mut seen = std::collections::HashSet::new();
        for tag in &self.tags {
            if !seen.insert(tag.as_str()) {
                return Err(Error::InvalidField {
                    field: "CompiledArticle.tags",
                    reason: format!("duplicate tag {tag:?}"),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub score: f64,
    pub retries_used: u32,
}

pub const QUALITY_THRESHOLD: f64 = 0.70;
pub const MAX_RETRIES: u32 = 3;

impl QualityReport {
    pub fn is_terminal(&self) -> bool {
        self.score >= QUALITY_THRESHOLD || self.retries_used >= MAX_RETRIES
    }
}

/// Persisted form of a [`CompiledArticle`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredArticle {
    pub id: i64,
    pub thread_id: Uuid,
    pub article: CompiledArticle,
    pub embedding: Option<Vec<f32>>,
    pub quality_score: f64,
    pub is_visible: bool,
    pub source_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportState {
    Pending,
    Complete,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportJob {
    pub id: Uuid,
    pub source_scope: String,
    pub format: String,
    pub state: ExportState,
    pub record_count: u64,
    pub file_path: Option<String>,
    pub content_hash: Option<String>,
    pub manifest_hash: Option<String>,
    pub consent_verified: bool,
    pub file_size_bytes: Option<u64>,
    pub c2pa_manifest_hash: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(id: &str, secs: i64) -> RawMessage {
        RawMessage {
            message_id: id.into(),
            author_handle: "a".into(),
            content: "hello".into(),
            timestamp: DateTime::from_timestamp(secs, 0).unwrap(),
            reply_to: None,
            mentions: vec![],
            has_code: false,
            source_type: SourceType::Discord,
        }
    }

    #[test]
    fn thread_rejects_empty() {
        assert!(Thread::new(vec![]).is_err());
    }

    #[test]
    fn thread_sorts_by_timestamp() {
        let t = Thread::new(vec![msg("b", 20), msg("a", 10)]).unwrap();
        assert_eq!(t.messages[0].message_id, "a");
        assert_eq!(t.messages[1].message_id, "b");
    }

    #[test]
    fn classification_parse_lenient_falls_back() {
        assert_eq!(
            Classification::parse_lenient("not a real label"),
            Classification::QuestionAnswer
        );
        assert_eq!(
            Classification::parse_lenient("troubleshooting"),
            Classification::Troubleshooting
        );
    }

    #[test]
    fn evaluation_resolved_implies_solution() {
        let e = Evaluation::new(false, true, true, "r".into());
        assert!(!e.is_resolved);
    }

    #[test]
    fn compiled_article_validate_rejects_empty_solution() {
        let article = CompiledArticle {
            article_type: Classification::Guide,
            symptom: "s".into(),
            diagnosis: "d".into(),
            solution: "".into(),
            code_snippet: None,
            language: GENERAL_LANGUAGE.into(),
            framework: None,
            tags: vec![],
            confidence: 0.5,
            thread_summary: "sum".into(),
            source_url: None,
        };
        assert!(article.validate().is_err());
    }

    #[test]
    fn quality_report_terminal_on_threshold_or_retries() {
        assert!(QualityReport { score: 0.70, retries_used: 0 }.is_terminal());
        assert!(QualityReport { score: 0.0, retries_used: 3 }.is_terminal());
        assert!(!QualityReport { score: 0.5, retries_used: 1 }.is_terminal());
    }

    proptest::proptest! {
        #[test]
        fn thread_new_sorts_any_permutation_ascending(offsets in proptest::collection::vec(0i64..100_000, 1..20)) {
            let messages: Vec<RawMessage> = offsets
                .iter()
                .enumerate()
                .map(|(i, secs)| msg(&format!("m{i}"), *secs))
                .collect();
            let thread = Thread::new(messages).unwrap();
            let timestamps: Vec<_> = thread.messages.iter().map(|m| m.timestamp).collect();
            prop_assert!(timestamps.windows(2).all(|w| w[0] <= w[1]));
        }
    }
}
