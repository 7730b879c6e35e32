//! Generic checkpointable state-machine executor: register [`Node`]s on a
//! [`StateGraph`], wire direct or conditional edges, compile, and invoke
//! with an optional [`Checkpointer`] for suspend/resume support.

pub mod checkpoint;
pub mod error;
pub mod graph;
pub mod node;
pub mod state;

pub use checkpoint::{Checkpointer, MemoryCheckpointer};
pub use error::{Error, Result};
pub use graph::{CompiledGraph, InvokeOutcome, StateGraph, END};
pub use node::{FnNode, Node, NodeError};
pub use state::MergeableState;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq)]
    struct Counter {
        value: i32,
        messages: Vec<i32>,
    }

    impl MergeableState for Counter {
        fn merge(&mut self, other: &Self) {
            self.messages.extend(other.messages.iter().copied());
        }
    }

    struct Increment;

    #[async_trait::async_trait]
    impl Node<Counter> for Increment {
        async fn execute(&self, mut state: Counter) -> Result<Counter, NodeError> {
            state.value += 1;
            Ok(state)
        }

        fn name(&self) -> &str {
            "increment"
        }
    }

    #[tokio::test]
    async fn direct_edge_runs_to_end() {
        let mut graph = StateGraph::new();
        graph.add_node(Arc::new(Increment));
        graph.set_entry_point("increment");
        graph.add_edge("increment", END);
        let compiled = graph.compile().unwrap();

        let outcome = compiled
            .invoke(Counter { value: 0, messages: vec![] })
            .await
            .unwrap();
        assert_eq!(outcome.final_state.value, 1);
        assert_eq!(outcome.nodes_executed, vec!["increment"]);
        assert!(outcome.suspended_at.is_none());
    }

    #[tokio::test]
    async fn conditional_edge_routes_by_state() {
        let mut graph = StateGraph::new();
        graph.add_node(Arc::new(Increment));
        graph.set_entry_point("increment");
        let mut routes = HashMap::new();
        routes.insert("big".to_string(), END.to_string());
        routes.insert("small".to_string(), END.to_string());
        graph.add_conditional_edges(
            "increment",
            |s: &Counter| if s.value > 0 { "big".to_string() } else { "small".to_string() },
            routes,
        );
        let compiled = graph.compile().unwrap();

        let outcome = compiled
            .invoke(Counter { value: 0, messages: vec![] })
            .await
            .unwrap();
        assert_eq!(outcome.final_state.value, 1);
    }

    #[tokio::test]
    async fn interrupt_before_suspends_and_checkpoints() {
        let mut graph = StateGraph::new();
        graph.add_node(Arc::new(Increment));
        graph.set_entry_point("increment");
        graph.add_edge("increment", END);
        let checkpointer: Arc<dyn Checkpointer<Counter>> = Arc::new(MemoryCheckpointer::new());
        let compiled = graph
            .compile()
            .unwrap()
            .with_checkpointer(checkpointer.clone())
            .with_thread_id("t1")
            .with_interrupt_before(vec!["increment"]);

        let outcome = compiled
            .invoke(Counter { value: 0, messages: vec![1] })
            .await
            .unwrap();
        assert_eq!(outcome.suspended_at, Some("increment".to_string()));
        assert_eq!(outcome.final_state.value, 0);

        let reloaded = checkpointer.load("t1").await.unwrap().unwrap();
        assert_eq!(reloaded.messages, vec![1]);
    }

    #[tokio::test]
    async fn resume_merges_new_messages_into_prior_state() {
        let mut graph = StateGraph::new();
        graph.add_node(Arc::new(Increment));
        graph.set_entry_point("increment");
        graph.add_edge("increment", END);
        let checkpointer: Arc<dyn Checkpointer<Counter>> = Arc::new(MemoryCheckpointer::new());
        checkpointer
            .save("t1", &Counter { value: 5, messages: vec![1] })
            .await
            .unwrap();

        let compiled = graph
            .compile()
            .unwrap()
            .with_checkpointer(checkpointer)
            .with_thread_id("t1");

        let outcome = compiled
            .invoke(Counter { value: 0, messages: vec![2] })
            .await
            .unwrap();
        assert_eq!(outcome.final_state.value, 6);
        assert_eq!(outcome.final_state.messages, vec![1, 2]);
    }
}
