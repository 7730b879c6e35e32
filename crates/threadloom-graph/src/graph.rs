use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::checkpoint::Checkpointer;
use crate::error::{Error, Result};
use crate::node::Node;
use crate::state::MergeableState;

/// Sentinel target name meaning "terminate the run".
pub const END: &str = "__end__";

type RouterFn<S> = Arc<dyn Fn(&S) -> String + Send + Sync>;

enum Edge<S> {
    Direct(String),
    Conditional {
        router: RouterFn<S>,
        routes: HashMap<String, String>,
    },
}

/// Builder for a node graph: register nodes, wire edges (direct or
/// conditional), set the entry point, then [`StateGraph::compile`].
pub struct StateGraph<S: Send + Sync + 'static> {
    nodes: HashMap<String, Arc<dyn Node<S>>>,
    edges: HashMap<String, Edge<S>>,
    entry_point: Option<String>,
}

impl<S: Send + Sync + 'static> Default for StateGraph<S> {
    fn default() -> Self {
        StateGraph {
            nodes: HashMap::new(),
            edges: HashMap::new(),
            entry_point: None,
        }
    }
}

impl<S: Send + Sync + 'static> StateGraph<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: Arc<dyn Node<S>>) -> &mut Self {
        self.nodes.insert(node.name().to_string(), node);
        self
    }

    pub fn set_entry_point(&mut self, name: &str) -> &mut Self {
        self.entry_point = Some(name.to_string());
        self
    }

    pub fn add_edge(&mut self, from: &str, to: &str) -> &mut Self {
        self.edges.insert(from.to_string(), Edge::Direct(to.to_string()));
        self
    }

    pub fn add_conditional_edges<F>(&mut self, from: &str, router: F, routes: HashMap<String, String>) -> &mut Self
    where
        F: Fn(&S) -> String + Send + Sync + 'static,
    {
        self.edges.insert(
            from.to_string(),
            Edge::Conditional {
                router: Arc::new(router),
                routes,
            },
        );
        self
    }

    pub fn compile(self) -> Result<CompiledGraph<S>> {
        let entry_point = self.entry_point.ok_or(Error::MissingEntryPoint)?;
        if !self.nodes.contains_key(&entry_point) {
            return Err(Error::NodeNotFound(entry_point));
        }
        Ok(CompiledGraph {
            nodes: self.nodes,
            edges: self.edges,
            entry_point,
            checkpointer: None,
            thread_id: None,
            interrupt_before: HashSet::new(),
            interrupt_after: HashSet::new(),
        })
    }
}

/// The outcome of an [`CompiledGraph::invoke`] or
/// [`CompiledGraph::resume`] call.
#[derive(Debug, Clone)]
pub struct InvokeOutcome<S> {
    pub final_state: S,
    pub nodes_executed: Vec<String>,
    pub suspended_at: Option<String>,
    pub next_nodes: Vec<String>,
}

/// A compiled, runnable graph. Optionally backed by a [`Checkpointer`]
/// and a stable `thread_id`, and optionally configured to suspend before
/// or after specific nodes (used by the evaluator's suspend transition).
pub struct CompiledGraph<S: Send + Sync + Clone + MergeableState + 'static> {
    nodes: HashMap<String, Arc<dyn Node<S>>>,
    edges: HashMap<String, Edge<S>>,
    entry_point: String,
    checkpointer: Option<Arc<dyn Checkpointer<S>>>,
    thread_id: Option<String>,
    interrupt_before: HashSet<String>,
    interrupt_after: HashSet<String>,
}

impl<S: Send + Sync + Clone + MergeableState + 'static> CompiledGraph<S> {
    pub fn with_checkpointer(mut self, checkpointer: Arc<dyn Checkpointer<S>>) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    pub fn with_thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn with_interrupt_before(mut self, nodes: Vec<&str>) -> Self {
        self.interrupt_before = nodes.into_iter().map(str::to_string).collect();
        self
    }

    pub fn with_interrupt_after(mut self, nodes: Vec<&str>) -> Self {
        self.interrupt_after = nodes.into_iter().map(str::to_string).collect();
        self
    }

    /// Runs the graph from its entry point. If a checkpointer and
    /// thread_id are configured and a prior checkpoint exists for that
    /// thread_id, the prior state is reloaded and `initial_state` is
    /// merged into it (append-only fields accumulate; the rest follow
    /// each node's fresh writes as the graph re-executes).
    pub async fn invoke(&self, initial_state: S) -> Result<InvokeOutcome<S>> {
        let starting_state = self.reload_and_merge(initial_state).await?;
        self.run_from(&self.entry_point, starting_state).await
    }

    /// Reloads the checkpoint for the configured `thread_id` and resumes
    /// execution from whichever node the run previously suspended before.
    /// Requires a checkpointer, thread_id, and an existing checkpoint.
    pub async fn resume(&self) -> Result<InvokeOutcome<S>> {
        let thread_id = self
            .thread_id
            .as_ref()
            .ok_or_else(|| Error::CheckpointNotFound("no thread_id configured".into()))?;
        let checkpointer = self
            .checkpointer
            .as_ref()
            .ok_or_else(|| Error::CheckpointNotFound("no checkpointer configured".into()))?;
        let state = checkpointer
            .load(thread_id)
            .await?
            .ok_or_else(|| Error::CheckpointNotFound(thread_id.clone()))?;
        self.run_from(&self.entry_point, state).await
    }

    async fn reload_and_merge(&self, initial_state: S) -> Result<S> {
        if let (Some(checkpointer), Some(thread_id)) = (&self.checkpointer, &self.thread_id) {
            if let Some(mut prior) = checkpointer.load(thread_id).await? {
                prior.merge(&initial_state);
                return Ok(prior);
            }
        }
        Ok(initial_state)
    }

    async fn run_from(&self, start: &str, mut state: S) -> Result<InvokeOutcome<S>> {
        let mut current = start.to_string();
        let mut nodes_executed = Vec::new();

        loop {
            if current == END {
                self.checkpoint_and_clear(&state).await?;
                return Ok(InvokeOutcome {
                    final_state: state,
                    nodes_executed,
                    suspended_at: None,
                    next_nodes: vec![],
                });
            }

            if self.interrupt_before.contains(&current) {
                self.checkpoint(&state).await?;
                return Ok(InvokeOutcome {
                    final_state: state,
                    nodes_executed,
                    suspended_at: Some(current.clone()),
                    next_nodes: vec![current],
                });
            }

            let node = self.nodes.get(&current).ok_or_else(|| Error::NodeNotFound(current.clone()))?;

            tracing::debug!(node = %current, "graph_node_dispatch");
            state = node
                .execute(state)
                .await
                .map_err(|source| Error::NodeFailed {
                    node: current.clone(),
                    source,
                })?;
            nodes_executed.push(current.clone());

            if self.interrupt_after.contains(&current) {
                self.checkpoint(&state).await?;
                let next = self.next_node_name(&current, &state)?;
                return Ok(InvokeOutcome {
                    final_state: state,
                    nodes_executed,
                    suspended_at: Some(current.clone()),
                    next_nodes: vec![next],
                });
            }

            current = self.next_node_name(&current, &state)?;
        }
    }

    fn next_node_name(&self, from: &str, state: &S) -> Result<String> {
        match self.edges.get(from) {
            None => Ok(END.to_string()),
            Some(Edge::Direct(to)) => Ok(to.clone()),
            Some(Edge::Conditional { router, routes }) => {
                let key = router(state);
                if key == END {
                    return Ok(END.to_string());
                }
                routes
                    .get(&key)
                    .cloned()
                    .ok_or_else(|| Error::UnknownRoute(key))
            }
        }
    }

    async fn checkpoint(&self, state: &S) -> Result<()> {
        if let (Some(checkpointer), Some(thread_id)) = (&self.checkpointer, &self.thread_id) {
            checkpointer.save(thread_id, state).await?;
        }
        Ok(())
    }

    async fn checkpoint_and_clear(&self, state: &S) -> Result<()> {
        self.checkpoint(state).await
    }
}
