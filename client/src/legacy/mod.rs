//! The legacy tree-diff engine: an alternate, simpler design for the same
//! synchronization problem, operating over dynamic key-value trees with
//! path-pattern listener matching. Self-contained; the schema decoder does
//! not depend on it.

pub mod diff;
pub mod listener;
pub mod value;

pub use diff::{generate, PatchOp, TreePatch};
pub use listener::{ListenerId, PatchEvent, PatchHandler, PatchListeners, PatternError};
pub use value::TreeValue;

/// Holds the previous tree snapshot and the listener registry: each
/// [`TreeMirror::set`] diffs the incoming snapshot against the held one,
/// dispatches the patches, and stores the new snapshot.
pub struct TreeMirror {
    current: TreeValue,
    listeners: PatchListeners,
}

impl TreeMirror {
    pub fn new(initial: TreeValue) -> Self {
        Self {
            current: initial,
            listeners: PatchListeners::new(),
        }
    }

    pub fn current(&self) -> &TreeValue {
        &self.current
    }

    pub fn listeners_mut(&mut self) -> &mut PatchListeners {
        &mut self.listeners
    }

    /// Diff `snapshot` against the held state, dispatch the resulting
    /// patches, and adopt the snapshot. Returns the patch list.
    pub fn set(&mut self, snapshot: TreeValue) -> Vec<TreePatch> {
        let patches = generate(&self.current, &snapshot);
        self.listeners.dispatch(&patches);
        self.current = snapshot;
        patches
    }
}
