//! Error types for tree mutations and the list controller.

/// Errors returned by tree mutations and `TreeList` operations.
///
/// Mutations are atomic: when an operation returns an error, the tree,
/// the projection, and the node→index map are left exactly as they were
/// and no event is emitted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// A mutation would give two children of one parent the same key.
    #[error("duplicate child key: {key}")]
    DuplicateKey { key: String },

    /// A key or path segment does not name an existing child.
    #[error("no child with key: {key}")]
    NotFound { key: String },

    /// The node was detached from the tree, or never belonged to it.
    #[error("node is not attached to this tree")]
    DetachedNode,

    /// The operation targets the hidden root node, which has no payload
    /// and is always expanded.
    #[error("operation not supported on the root node")]
    RootNode,

    /// The list controller has been disposed.
    #[error("tree list has been disposed")]
    Disposed,
}

pub type Result<T> = std::result::Result<T, TreeError>;
