//! Node identity, paths, and node specifications.

use std::collections::HashMap;
use std::fmt;

use slotmap::new_key_type;

new_key_type! {
    /// Stable identity of a node in the tree arena.
    ///
    /// Ids are never reused: once a node is detached, its id stays valid
    /// for lookups (e.g. exit snapshots) but the node no longer takes part
    /// in path resolution or events.
    pub struct NodeId;
}

/// A path from the root to a node, as the sequence of sibling keys.
///
/// The empty path names the hidden root. Resolving a path costs one map
/// lookup per segment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TreePath {
    segments: Vec<String>,
}

impl TreePath {
    /// The empty path (the hidden root).
    pub fn root() -> Self {
        Self::default()
    }

    pub fn new(segments: Vec<String>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments; 0 for the root.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Extend the path with one more sibling key.
    pub fn join(&self, key: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(key.into());
        Self { segments }
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "/");
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl<S: Into<String>> FromIterator<S> for TreePath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            segments: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Description of a node (and optionally a whole subtree) to insert.
///
/// Keys must be unique among siblings. Nodes default to collapsed; a spec
/// marked `expanded` has its children visible as soon as the spec itself
/// lands in a visible position.
///
/// # Example
///
/// ```ignore
/// let spec = NodeSpec::new("src", dir("src"))
///     .expanded(true)
///     .child(NodeSpec::new("main.rs", file("main.rs")))
///     .child(NodeSpec::new("lib.rs", file("lib.rs")));
/// tree.add_children(tree.root(), vec![spec])?;
/// ```
#[derive(Debug, Clone)]
pub struct NodeSpec<T> {
    pub key: String,
    pub value: T,
    pub expanded: bool,
    pub children: Vec<NodeSpec<T>>,
}

impl<T> NodeSpec<T> {
    /// Create a leaf spec with the given sibling key and payload.
    pub fn new(key: impl Into<String>, value: T) -> Self {
        Self {
            key: key.into(),
            value,
            expanded: false,
            children: Vec::new(),
        }
    }

    /// Set the initial expansion flag.
    pub fn expanded(mut self, expanded: bool) -> Self {
        self.expanded = expanded;
        self
    }

    /// Append one child spec.
    pub fn child(mut self, child: NodeSpec<T>) -> Self {
        self.children.push(child);
        self
    }

    /// Append several child specs.
    pub fn children(mut self, children: impl IntoIterator<Item = NodeSpec<T>>) -> Self {
        self.children.extend(children);
        self
    }
}

/// Arena record for one node.
#[derive(Debug)]
pub(crate) struct NodeData<T> {
    /// Sibling key; unique among the children of one parent.
    pub key: String,
    /// Payload; `None` only for the hidden root.
    pub value: Option<T>,
    /// Arena key of the parent; non-owning, `None` for the root and for
    /// the top node of a detached subtree.
    pub parent: Option<NodeId>,
    /// Children in order.
    pub children: Vec<NodeId>,
    /// Children keyed by sibling key, for O(depth) path resolution.
    pub child_index: HashMap<String, NodeId>,
    pub expanded: bool,
    pub detached: bool,
}

impl<T> NodeData<T> {
    pub fn root() -> Self {
        Self {
            key: String::new(),
            value: None,
            parent: None,
            children: Vec::new(),
            child_index: HashMap::new(),
            // The root is always expanded for projection purposes.
            expanded: true,
            detached: false,
        }
    }

    pub fn new(key: String, value: T, parent: NodeId, expanded: bool) -> Self {
        Self {
            key,
            value: Some(value),
            parent: Some(parent),
            children: Vec::new(),
            child_index: HashMap::new(),
            expanded,
            detached: false,
        }
    }
}
