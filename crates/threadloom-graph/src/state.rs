/// A graph state type with declared per-field merge semantics for
/// checkpoint resumption. Most fields are last-writer-wins (the default
/// the type's own assignment gives you); the one exception in this
/// workspace is the inbound message list, which is append-only, so
/// `merge` is the single place that distinction is expressed.
pub trait MergeableState: Send + Sync {
    /// Merges `other` (the state reloaded from a checkpoint) into `self`
    /// (the freshly constructed state for this invocation), honoring each
    /// field's declared merge policy. Called once, before the first node
    /// of a resumed run executes.
    fn merge(&mut self, other: &Self);
}
