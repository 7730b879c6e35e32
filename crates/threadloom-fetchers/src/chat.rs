//! Push-style producer for chat platforms (Discord-shaped: numeric user
//! IDs, reply references, mentions). Real user IDs are hashed at the
//! boundary and never stored past this point.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use threadloom_core::{RawMessage, SourceType};
use threadloom_ingest::StreamBuffer;

/// Receives a flushed batch and hands it to the ingest worker pool.
/// Kept as a trait so this crate never depends on the extraction/LLM
/// stack directly — only the binary wiring the pipeline together does.
#[async_trait]
pub trait BatchDispatcher: Send + Sync {
    async fn dispatch(&self, source_scope: &str, channel_scope: &str, source_type: SourceType, messages: Vec<RawMessage>);
}

/// A single incoming chat event before hashing/redaction.
pub struct ChatEvent {
    pub message_id: String,
    pub author_id: u64,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub reply_to: Option<String>,
    pub mention_ids: Vec<u64>,
}

/// Buffers incoming chat events per `(server, channel)` and dispatches a
/// batch once [`StreamBuffer`] reports the flush threshold was crossed.
pub struct ChatProducer {
    buffer: Arc<StreamBuffer>,
    dispatcher: Arc<dyn BatchDispatcher>,
}

impl ChatProducer {
    pub fn new(buffer: Arc<StreamBuffer>, dispatcher: Arc<dyn BatchDispatcher>) -> Self {
        ChatProducer { buffer, dispatcher }
    }

    /// Hashes identities, detects code fences, and buffers the event.
    /// Returns `true` if this publish crossed the batch threshold and a
    /// batch was dispatched.
    pub async fn publish(&self, server_id: &str, channel_id: &str, event: ChatEvent) -> bool {
        let author_handle = threadloom_identity::hash(event.author_id);
        let mentions = event.mention_ids.into_iter().map(threadloom_identity::hash).collect();
        let has_code = RawMessage::detect_has_code(&event.content);

        let message = RawMessage {
            message_id: event.message_id,
            author_handle,
            content: event.content,
            timestamp: event.timestamp,
            reply_to: event.reply_to,
            mentions,
            has_code,
            source_type: SourceType::Discord,
        };

        match self.buffer.push(server_id, channel_id, message).await {
            Some(batch) => {
                tracing::info!(server = server_id, channel = channel_id, count = batch.len(), "batch_triggered");
                self.dispatcher.dispatch(server_id, channel_id, SourceType::Discord, batch).await;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingDispatcher(AtomicUsize);

    #[async_trait]
    impl BatchDispatcher for CountingDispatcher {
        async fn dispatch(&self, _source_scope: &str, _channel_scope: &str, _source_type: SourceType, _messages: Vec<RawMessage>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn event(id: &str) -> ChatEvent {
        ChatEvent {
            message_id: id.into(),
            author_id: 42,
            content: "hello".into(),
            timestamp: Utc::now(),
            reply_to: None,
            mention_ids: vec![],
        }
    }

    #[tokio::test]
    async fn does_not_dispatch_below_threshold() {
        let dispatcher = Arc::new(CountingDispatcher(AtomicUsize::new(0)));
        let producer = ChatProducer::new(Arc::new(StreamBuffer::new()), dispatcher.clone());
        assert!(!producer.publish("guild-1", "chan-1", event("1")).await);
        assert_eq!(dispatcher.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn dispatches_at_batch_size() {
        let dispatcher = Arc::new(CountingDispatcher(AtomicUsize::new(0)));
        let producer = ChatProducer::new(Arc::new(StreamBuffer::new()), dispatcher.clone());
        let mut triggered = false;
        for i in 0..threadloom_ingest::BATCH_SIZE {
            triggered = producer.publish("guild-1", "chan-1", event(&i.to_string())).await;
        }
        assert!(triggered);
        assert_eq!(dispatcher.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn author_id_never_appears_in_hashed_handle() {
        let dispatcher = Arc::new(CountingDispatcher(AtomicUsize::new(0)));
        let producer = ChatProducer::new(Arc::new(StreamBuffer::new()), dispatcher);
        producer.publish("guild-1", "chan-1", event("1")).await;
        let hash = threadloom_identity::hash(42u64);
        assert!(!hash.contains("42"));
        assert_eq!(hash.len(), 64);
    }
}
