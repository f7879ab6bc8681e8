//! The mutable tree: keyed, ordered children, expansion flags, and the
//! change notifier.
//!
//! The tree owns a hidden root node. The root carries no payload, is always
//! expanded, and never appears in a projection; top-level items are its
//! children. All structural mutations are atomic: inputs are validated in
//! full before anything changes, and each successful mutation emits exactly
//! one [`TreeEvent`].

use std::collections::HashSet;

use log::debug;
use slotmap::SlotMap;

use crate::error::{Result, TreeError};
use crate::event::{Events, Notifier, TreeEvent};
use crate::node::{NodeData, NodeId, NodeSpec, TreePath};

/// A tree of keyed, ordered, expandable nodes with payloads of type `T`.
#[derive(Debug)]
pub struct Tree<T> {
    nodes: SlotMap<NodeId, NodeData<T>>,
    root: NodeId,
    notifier: Notifier,
}

impl<T> Default for Tree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Tree<T> {
    /// Create an empty tree.
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(NodeData::root());
        Self {
            nodes,
            root,
            notifier: Notifier::default(),
        }
    }

    /// Create a tree with initial top-level children.
    ///
    /// No event is emitted for the initial population; there can be no
    /// subscribers yet.
    pub fn with_children(specs: Vec<NodeSpec<T>>) -> Result<Self> {
        let mut tree = Self::new();
        let root = tree.root;
        let position = 0;
        tree.splice_children(root, position, specs)?;
        Ok(tree)
    }

    /// The hidden root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    /// Append children to `parent`, in argument order.
    ///
    /// Fails with [`TreeError::DuplicateKey`] if any spec key collides with
    /// an existing child of `parent` or with another spec in the batch; the
    /// tree is left unchanged. Emits one `Added` event naming all new nodes.
    pub fn add_children(&mut self, parent: NodeId, specs: Vec<NodeSpec<T>>) -> Result<Vec<NodeId>> {
        let position = self.attached(parent)?.children.len();
        let ids = self.splice_children(parent, position, specs)?;
        self.emit(TreeEvent::Added {
            parent,
            nodes: ids.clone(),
        });
        Ok(ids)
    }

    /// Insert children at a specific sibling index.
    ///
    /// `position` is clamped to `0..=child_count`; a position past the end
    /// behaves exactly like [`Tree::add_children`]. (Positions are `usize`,
    /// so negative positions are unrepresentable; clamping is the documented
    /// out-of-range policy.) Emits one `Inserted` event carrying the clamped
    /// position and the new nodes in final sibling order.
    pub fn insert_children(
        &mut self,
        parent: NodeId,
        position: usize,
        specs: Vec<NodeSpec<T>>,
    ) -> Result<Vec<NodeId>> {
        let position = position.min(self.attached(parent)?.children.len());
        let ids = self.splice_children(parent, position, specs)?;
        self.emit(TreeEvent::Inserted {
            parent,
            position,
            nodes: ids.clone(),
        });
        Ok(ids)
    }

    /// Detach the named children of `parent`, with their entire subtrees.
    ///
    /// Fails with [`TreeError::NotFound`] if any key is not a child of
    /// `parent`; nothing is removed in that case. Detached nodes stay
    /// readable through [`Tree::value`] and [`Tree::key_of`] (so exit
    /// snapshots can still be built) but are permanently out of the tree.
    /// Emits one `Removed` event naming the directly detached nodes.
    pub fn remove_children(&mut self, parent: NodeId, keys: &[&str]) -> Result<Vec<NodeId>> {
        let data = self.attached(parent)?;
        let mut ids = Vec::with_capacity(keys.len());
        for key in keys {
            match data.child_index.get(*key) {
                Some(&id) if !ids.contains(&id) => ids.push(id),
                Some(_) => {} // same key named twice
                None => {
                    return Err(TreeError::NotFound {
                        key: (*key).to_string(),
                    });
                }
            }
        }
        for &id in &ids {
            self.detach(parent, id);
        }
        self.emit(TreeEvent::Removed {
            parent,
            nodes: ids.clone(),
        });
        Ok(ids)
    }

    /// Replace a node's payload, returning the previous value.
    ///
    /// Does not affect tree shape; emits one `Updated` event.
    pub fn update_value(&mut self, node: NodeId, value: T) -> Result<T> {
        if node == self.root {
            return Err(TreeError::RootNode);
        }
        let data = self.attached_mut(node)?;
        let Some(old) = data.value.replace(value) else {
            return Err(TreeError::RootNode);
        };
        self.emit(TreeEvent::Updated { node });
        Ok(old)
    }

    /// Set a node's expansion flag, returning the previous flag.
    ///
    /// This is a pure state toggle: it emits **no** event. Expansion changes
    /// the projection, not the tree, and is observed separately by the list
    /// controller.
    pub fn set_expanded(&mut self, node: NodeId, expanded: bool) -> Result<bool> {
        if node == self.root {
            return Err(TreeError::RootNode);
        }
        let data = self.attached_mut(node)?;
        let previous = data.expanded;
        data.expanded = expanded;
        Ok(previous)
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// The ordered children of an attached node.
    pub fn children_of(&self, node: NodeId) -> Result<Vec<NodeId>> {
        Ok(self.attached(node)?.children.clone())
    }

    /// Resolve a path of sibling keys, one map lookup per level.
    ///
    /// The empty path resolves to the hidden root.
    pub fn resolve_path(&self, path: &TreePath) -> Result<NodeId> {
        let mut current = self.root;
        for segment in path.segments() {
            let data = &self.nodes[current];
            match data.child_index.get(segment) {
                Some(&child) => current = child,
                None => {
                    return Err(TreeError::NotFound {
                        key: segment.clone(),
                    });
                }
            }
        }
        Ok(current)
    }

    /// The path from the root to an attached node.
    pub fn path_of(&self, node: NodeId) -> Result<TreePath> {
        self.attached(node)?;
        let mut segments = Vec::new();
        let mut current = node;
        while current != self.root {
            let data = &self.nodes[current];
            segments.push(data.key.clone());
            match data.parent {
                Some(parent) => current = parent,
                None => return Err(TreeError::DetachedNode),
            }
        }
        segments.reverse();
        Ok(TreePath::new(segments))
    }

    /// A node's payload. `None` for the root and for unknown ids; still
    /// available for detached nodes.
    pub fn value(&self, node: NodeId) -> Option<&T> {
        self.nodes.get(node).and_then(|data| data.value.as_ref())
    }

    /// A node's sibling key. Still available for detached nodes.
    pub fn key_of(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node).map(|data| data.key.as_str())
    }

    /// A node's parent. `None` for the root, unknown ids, and the top node
    /// of a detached subtree.
    pub fn parent_of(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node).and_then(|data| data.parent)
    }

    pub fn is_expanded(&self, node: NodeId) -> bool {
        self.nodes.get(node).is_some_and(|data| data.expanded)
    }

    /// Whether the node is currently part of the tree.
    pub fn is_attached(&self, node: NodeId) -> bool {
        self.nodes.get(node).is_some_and(|data| !data.detached)
    }

    /// Whether the id names a node this tree has ever created, detached
    /// ones included.
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(node)
    }

    /// Number of attached nodes, the hidden root excluded.
    pub fn len(&self) -> usize {
        self.nodes.values().filter(|data| !data.detached).count() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.nodes[self.root].children.is_empty()
    }

    // -------------------------------------------------------------------------
    // Change notification
    // -------------------------------------------------------------------------

    /// Subscribe to events anchored at or below `scope`.
    ///
    /// Subscribing at the root observes every mutation. Delivery starts with
    /// the next mutation; nothing is replayed.
    pub fn subscribe(&mut self, scope: NodeId) -> Result<Events> {
        self.attached(scope)?;
        Ok(self.notifier.subscribe(scope))
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&mut self) -> usize {
        self.notifier.live_count()
    }

    /// Root-scoped subscription; the root is always attached, so this
    /// cannot fail.
    pub(crate) fn subscribe_root(&mut self) -> Events {
        let root = self.root;
        self.notifier.subscribe(root)
    }

    fn emit(&mut self, event: TreeEvent) {
        let chain = self.ancestor_chain(event.anchor());
        debug!("tree event: {event:?}");
        self.notifier.emit(&event, &chain);
    }

    /// The anchor node together with all its ancestors up to the root.
    fn ancestor_chain(&self, anchor: NodeId) -> HashSet<NodeId> {
        let mut chain = HashSet::new();
        let mut current = Some(anchor);
        while let Some(id) = current {
            chain.insert(id);
            current = self.nodes.get(id).and_then(|data| data.parent);
        }
        chain
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn attached(&self, node: NodeId) -> Result<&NodeData<T>> {
        match self.nodes.get(node) {
            Some(data) if !data.detached => Ok(data),
            _ => Err(TreeError::DetachedNode),
        }
    }

    fn attached_mut(&mut self, node: NodeId) -> Result<&mut NodeData<T>> {
        match self.nodes.get_mut(node) {
            Some(data) if !data.detached => Ok(data),
            _ => Err(TreeError::DetachedNode),
        }
    }

    /// Validate and materialize `specs` as children of `parent`, starting at
    /// sibling index `position` (already clamped). Returns the ids of the
    /// directly inserted nodes, in order.
    fn splice_children(
        &mut self,
        parent: NodeId,
        position: usize,
        specs: Vec<NodeSpec<T>>,
    ) -> Result<Vec<NodeId>> {
        Self::validate_specs(Some(&self.attached(parent)?.child_index), &specs)?;

        let mut ids = Vec::with_capacity(specs.len());
        for spec in specs {
            ids.push(self.materialize(parent, spec));
        }
        let data = &mut self.nodes[parent];
        for (offset, &id) in ids.iter().enumerate() {
            data.children.insert(position + offset, id);
        }
        for &id in &ids {
            let key = self.nodes[id].key.clone();
            self.nodes[parent].child_index.insert(key, id);
        }
        Ok(ids)
    }

    /// Check batch keys against the existing siblings and against each
    /// other, recursively for nested spec levels.
    fn validate_specs(
        existing: Option<&std::collections::HashMap<String, NodeId>>,
        specs: &[NodeSpec<T>],
    ) -> Result<()> {
        let mut seen = HashSet::new();
        for spec in specs {
            let collides = !seen.insert(spec.key.as_str())
                || existing.is_some_and(|index| index.contains_key(&spec.key));
            if collides {
                return Err(TreeError::DuplicateKey {
                    key: spec.key.clone(),
                });
            }
            Self::validate_specs(None, &spec.children)?;
        }
        Ok(())
    }

    /// Instantiate a spec subtree under `parent`. The caller links the top
    /// node into the parent's child list.
    fn materialize(&mut self, parent: NodeId, spec: NodeSpec<T>) -> NodeId {
        let NodeSpec {
            key,
            value,
            expanded,
            children,
        } = spec;
        let id = self.nodes.insert(NodeData::new(key, value, parent, expanded));
        for child_spec in children {
            let child_key = child_spec.key.clone();
            let child = self.materialize(id, child_spec);
            let data = &mut self.nodes[id];
            data.children.push(child);
            data.child_index.insert(child_key, child);
        }
        id
    }

    /// Unlink `node` from `parent` and mark its whole subtree detached.
    /// Internal parent links below `node` are kept so depths and values of
    /// the detached subtree stay readable.
    fn detach(&mut self, parent: NodeId, node: NodeId) {
        let key = self.nodes[node].key.clone();
        let data = &mut self.nodes[parent];
        data.children.retain(|&child| child != node);
        data.child_index.remove(&key);
        self.nodes[node].parent = None;

        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            let data = &mut self.nodes[id];
            data.detached = true;
            stack.extend(data.children.iter().copied());
        }
    }
}
