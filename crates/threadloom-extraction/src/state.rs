use chrono::{DateTime, Utc};
use threadloom_core::{Classification, CompiledArticle, Evaluation, RawMessage, SourceType};
use threadloom_graph::MergeableState;

/// Shared state record flowing through every node of the extraction
/// graph. `messages` is the only append-merge field; everything else is
/// last-writer-wins, which falls out naturally since each node
/// recomputes its own field(s) from scratch on every run.
#[derive(Debug, Clone, Default)]
pub struct AgentState {
    pub messages: Vec<RawMessage>,
    pub threads: Vec<Vec<RawMessage>>,
    pub source_type: Option<SourceType>,
    pub skip_disentangle: bool,
    pub classification: Option<Classification>,
    pub article_type: Option<Classification>,
    pub evaluation: Option<Evaluation>,
    pub compiled_article: Option<CompiledArticle>,
    pub quality_score: f64,
    pub retry_count: u32,
    pub current_thread_idx: usize,
    pub server_scope: String,
    pub channel_scope: String,
    pub batch_creation_time: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl AgentState {
    pub fn new(
        messages: Vec<RawMessage>,
        source_type: SourceType,
        server_scope: impl Into<String>,
        channel_scope: impl Into<String>,
    ) -> Self {
        AgentState {
            messages,
            skip_disentangle: !source_type.is_private(),
            source_type: Some(source_type),
            server_scope: server_scope.into(),
            channel_scope: channel_scope.into(),
            batch_creation_time: Some(Utc::now()),
            ..Default::default()
        }
    }

    pub fn current_thread(&self) -> Option<&[RawMessage]> {
        self.threads.get(self.current_thread_idx).map(Vec::as_slice)
    }
}

impl MergeableState for AgentState {
    fn merge(&mut self, other: &Self) {
        self.messages.extend(other.messages.iter().cloned());
    }
}

/// Derives the checkpoint key for a newly started thread: `(source_type,
/// channel_scope, batch_creation_time)`. `batch_creation_time` is the
/// wall-clock moment the logical thread began, not the flush time of
/// whichever batch happens to touch it — callers must reuse the id
/// [`channel_prefix`] resolves to an existing pending checkpoint rather
/// than calling this on every batch.
pub fn derive_thread_id(source_type: SourceType, channel_scope: &str, batch_creation_time: DateTime<Utc>) -> String {
    format!("{}{}", channel_prefix(source_type, channel_scope), batch_creation_time.timestamp())
}

/// The `(source_type, channel_scope)` portion of a [`derive_thread_id`]
/// key, shared by every thread ever opened on that channel. A
/// [`threadloom_graph::Checkpointer::find_by_prefix`] lookup against this
/// value finds a still-pending thread for the channel, if one exists.
pub fn channel_prefix(source_type: SourceType, channel_scope: &str) -> String {
    format!("{}:{}:", source_type.as_str(), channel_scope)
}
