//! Clusters a chronologically ordered stream of [`RawMessage`]s into
//! threads via an adjacency graph over semantic similarity, temporal
//! proximity, explicit reply/mention edges, and same-author continuation,
//! then takes connected components.

use chrono::Duration;
use threadloom_core::RawMessage;
use threadloom_embeddings::{cosine_similarity, Embeddings};

/// Two messages further apart than this are never linked, even
/// transitively through the embedding similarity path.
pub const TEMPORAL_WINDOW_HOURS: i64 = 4;
/// Same-author messages within this window get a similarity boost,
/// favoring continuation over a stranger's unrelated reply.
pub const SAME_AUTHOR_WINDOW_MINUTES: i64 = 10;
pub const SAME_AUTHOR_BOOST: f32 = 0.25;
pub const CODE_BOOST: f32 = 0.20;
pub const SIMILARITY_THRESHOLD: f32 = 0.45;

/// Clusters `messages` into threads. An embedding-provider failure is
/// treated as "no vector available": the similarity matrix degenerates to
/// identity (every off-diagonal entry is 0), which keeps every message in
/// its own singleton thread rather than aborting the batch.
pub async fn cluster(
    embeddings: &dyn Embeddings,
    messages: Vec<RawMessage>,
) -> Vec<Vec<RawMessage>> {
    if messages.is_empty() {
        return Vec::new();
    }
    if messages.len() == 1 {
        return vec![messages];
    }

    let n = messages.len();
    let vectors = match embed_all(embeddings, &messages).await {
        Some(v) => v,
        None => {
            tracing::warn!(
                count = n,
                "embedding_provider_failed, falling back to singleton threads"
            );
            return messages.into_iter().map(|m| vec![m]).collect();
        }
    };

    let mut adjacency = vec![vec![false; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            if should_link(&messages, &vectors, i, j) {
                adjacency[i][j] = true;
                adjacency[j][i] = true;
            }
        }
    }

    connected_components(&messages, &adjacency)
}

async fn embed_all(embeddings: &dyn Embeddings, messages: &[RawMessage]) -> Option<Vec<Vec<f32>>> {
    let texts: Vec<String> = messages.iter().map(|m| m.content.clone()).collect();
    embeddings.encode_batch(&texts, texts.len().max(1)).await.ok()
}

fn should_link(messages: &[RawMessage], vectors: &[Vec<f32>], i: usize, j: usize) -> bool {
    let msg_i = &messages[i];
    let msg_j = &messages[j];

    let time_delta = (msg_i.timestamp - msg_j.timestamp).abs();
    if time_delta > Duration::hours(TEMPORAL_WINDOW_HOURS) {
        return false;
    }

    if msg_j.reply_to.as_deref() == Some(msg_i.message_id.as_str())
        || msg_i.reply_to.as_deref() == Some(msg_j.message_id.as_str())
    {
        return true;
    }

    if msg_i.mentions.iter().any(|m| m == &msg_j.author_handle)
        || msg_j.mentions.iter().any(|m| m == &msg_i.author_handle)
    {
        return true;
    }

    let mut similarity = cosine_similarity(&vectors[i], &vectors[j]);

    if msg_i.author_handle == msg_j.author_handle
        && time_delta <= Duration::minutes(SAME_AUTHOR_WINDOW_MINUTES)
    {
        similarity += SAME_AUTHOR_BOOST;
    }

    if msg_i.has_code && msg_j.has_code {
        similarity += CODE_BOOST;
    }

    similarity >= SIMILARITY_THRESHOLD
}

fn connected_components(messages: &[RawMessage], adjacency: &[Vec<bool>]) -> Vec<Vec<RawMessage>> {
    let n = messages.len();
    let mut visited = vec![false; n];
    let mut threads = Vec::new();

    for start in 0..n {
        if visited[start] {
            continue;
        }

        let mut queue = std::collections::VecDeque::from([start]);
        let mut component = Vec::new();

        while let Some(node) = queue.pop_front() {
            if visited[node] {
                continue;
            }
            visited[node] = true;
            component.push(node);

            for neighbor in 0..n {
                if adjacency[node][neighbor] && !visited[neighbor] {
                    queue.push_back(neighbor);
                }
            }
        }

        component.sort_by_key(|&idx| messages[idx].timestamp);
        threads.push(component.into_iter().map(|idx| messages[idx].clone()).collect());
    }

    threads
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use threadloom_core::SourceType;
    use threadloom_embeddings::DeterministicEmbeddings;

    fn msg(id: &str, author: &str, content: &str, mins: i64) -> RawMessage {
        RawMessage {
            message_id: id.into(),
            author_handle: author.into(),
            content: content.into(),
            timestamp: Utc.timestamp_opt(1_700_000_000 + mins * 60, 0).unwrap(),
            reply_to: None,
            mentions: vec![],
            has_code: false,
            source_type: SourceType::Discord,
        }
    }

    #[tokio::test]
    async fn empty_input_yields_empty_output() {
        let e = DeterministicEmbeddings::new();
        let threads = cluster(&e, vec![]).await;
        assert!(threads.is_empty());
    }

    #[tokio::test]
    async fn single_message_yields_singleton_thread() {
        let e = DeterministicEmbeddings::new();
        let threads = cluster(&e, vec![msg("1", "a", "hello", 0)]).await;
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].len(), 1);
    }

    #[tokio::test]
    async fn covering_property_every_message_appears_once() {
        let e = DeterministicEmbeddings::new();
        let messages = vec![
            msg("1", "a", "one", 0),
            msg("2", "b", "two", 600),
            msg("3", "c", "three", 1200),
        ];
        let total_in = messages.len();
        let threads = cluster(&e, messages).await;
        let total_out: usize = threads.iter().map(|t| t.len()).sum();
        assert_eq!(total_in, total_out);
    }

    #[tokio::test]
    async fn explicit_reply_links_regardless_of_similarity() {
        let e = DeterministicEmbeddings::new();
        let mut reply = msg("2", "b", "completely unrelated text", 1);
        reply.reply_to = Some("1".into());
        let messages = vec![msg("1", "a", "original message", 0), reply];
        let threads = cluster(&e, messages).await;
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].len(), 2);
    }

    #[tokio::test]
    async fn temporal_gate_separates_distant_messages() {
        let e = DeterministicEmbeddings::new();
        let messages = vec![msg("1", "a", "same text", 0), msg("2", "a", "same text", 600)];
        let threads = cluster(&e, messages).await;
        assert_eq!(threads.len(), 2);
    }

    #[tokio::test]
    async fn threads_are_sorted_ascending_by_timestamp() {
        let e = DeterministicEmbeddings::new();
        let mut reply = msg("2", "b", "reply text", 0);
        reply.reply_to = Some("1".into());
        let messages = vec![reply, msg("1", "a", "orig text", 0)];
        let threads = cluster(&e, messages).await;
        let times: Vec<_> = threads[0].iter().map(|m| m.timestamp).collect();
        let mut sorted = times.clone();
        sorted.sort();
        assert_eq!(times, sorted);
    }
}
