use async_trait::async_trait;

pub type NodeError = Box<dyn std::error::Error + Send + Sync>;

/// One step of a [`crate::StateGraph`]. A node is given ownership of the
/// current state and returns the updated state, or an error if it cannot
/// proceed. There is no partial-failure recovery inside a node: an error
/// here aborts the whole run and the checkpoint is left untouched so a
/// later invocation can retry.
#[async_trait]
pub trait Node<S: Send + Sync>: Send + Sync {
    async fn execute(&self, state: S) -> Result<S, NodeError>;

    fn name(&self) -> &str;
}

/// Adapts a plain async function into a [`Node`], mirroring
/// `add_node_from_fn` builder ergonomics.
pub struct FnNode<S, F> {
    name: String,
    f: F,
    _marker: std::marker::PhantomData<fn(S)>,
}

impl<S, F> FnNode<S, F> {
    pub fn new(name: impl Into<String>, f: F) -> Self {
        FnNode {
            name: name.into(),
            f,
            _marker: std::marker::PhantomData,
        }
    }
}

#[async_trait]
impl<S, F, Fut> Node<S> for FnNode<S, F>
where
    S: Send + Sync + 'static,
    F: Fn(S) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<S, NodeError>> + Send,
{
    async fn execute(&self, state: S) -> Result<S, NodeError> {
        (self.f)(state).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}
