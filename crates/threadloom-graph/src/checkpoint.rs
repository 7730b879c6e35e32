use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::Result;

/// Persists and reloads graph state keyed by a stable `thread_id`, so a
/// suspended run can be resumed later with freshly arrived input merged
/// in. Implementations must leave a prior checkpoint untouched if the run
/// that would replace it errors out — the runtime never calls `save` on
/// an errored run.
#[async_trait]
pub trait Checkpointer<S: Send + Sync + Clone>: Send + Sync {
    async fn save(&self, thread_id: &str, state: &S) -> Result<()>;
    async fn load(&self, thread_id: &str) -> Result<Option<S>>;
    async fn delete(&self, thread_id: &str) -> Result<()>;

    /// Returns the `thread_id` of an existing checkpoint whose key starts
    /// with `prefix`, if any. Lets a caller that mints `thread_id`s with a
    /// wall-clock suffix (e.g. `"{source}:{channel}:{timestamp}"`) find a
    /// still-pending thread for a channel instead of minting a new one
    /// that can never see the suspended checkpoint.
    async fn find_by_prefix(&self, prefix: &str) -> Result<Option<String>>;
}

/// In-process checkpoint store, suitable for tests and for single-process
/// deployments where durability across restarts is not required.
#[derive(Default)]
pub struct MemoryCheckpointer<S> {
    store: DashMap<String, S>,
}

impl<S> MemoryCheckpointer<S> {
    pub fn new() -> Self {
        MemoryCheckpointer {
            store: DashMap::new(),
        }
    }
}

#[async_trait]
impl<S: Send + Sync + Clone> Checkpointer<S> for MemoryCheckpointer<S> {
    async fn save(&self, thread_id: &str, state: &S) -> Result<()> {
        self.store.insert(thread_id.to_string(), state.clone());
        Ok(())
    }

    async fn load(&self, thread_id: &str) -> Result<Option<S>> {
        Ok(self.store.get(thread_id).map(|r| r.value().clone()))
    }

    async fn delete(&self, thread_id: &str) -> Result<()> {
        self.store.remove(thread_id);
        Ok(())
    }

    async fn find_by_prefix(&self, prefix: &str) -> Result<Option<String>> {
        Ok(self
            .store
            .iter()
            .find(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_then_load_roundtrips() {
        let cp: MemoryCheckpointer<i32> = MemoryCheckpointer::new();
        cp.save("t1", &42).await.unwrap();
        assert_eq!(cp.load("t1").await.unwrap(), Some(42));
    }

    #[tokio::test]
    async fn load_missing_returns_none() {
        let cp: MemoryCheckpointer<i32> = MemoryCheckpointer::new();
        assert_eq!(cp.load("absent").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_removes_checkpoint() {
        let cp: MemoryCheckpointer<i32> = MemoryCheckpointer::new();
        cp.save("t1", &1).await.unwrap();
        cp.delete("t1").await.unwrap();
        assert_eq!(cp.load("t1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn find_by_prefix_matches_an_existing_thread() {
        let cp: MemoryCheckpointer<i32> = MemoryCheckpointer::new();
        cp.save("discord:general:1700000000", &1).await.unwrap();
        assert_eq!(
            cp.find_by_prefix("discord:general:").await.unwrap(),
            Some("discord:general:1700000000".to_string())
        );
    }

    #[tokio::test]
    async fn find_by_prefix_ignores_other_channels() {
        let cp: MemoryCheckpointer<i32> = MemoryCheckpointer::new();
        cp.save("discord:other-channel:1700000000", &1).await.unwrap();
        assert_eq!(cp.find_by_prefix("discord:general:").await.unwrap(), None);
    }
}
