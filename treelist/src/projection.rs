//! The flat projection controller.
//!
//! [`TreeList`] keeps a flat, ordered projection of the visible nodes of a
//! [`Tree`] — the nodes whose entire ancestor chain is expanded — plus a
//! node→index map for O(1) "where is this node right now" lookups. Every
//! mutation goes through the controller, which forwards it to the tree,
//! drains the resulting events from its own subscription queue, and drives
//! the animated-list primitive with position-accurate insert and remove
//! calls. Processing events from the queue after each mutation returns is
//! what serializes structural changes: a handler can never observe the
//! projection mid-update.
//!
//! Two invariants carry the whole design:
//! - the projection equals the pre-order traversal of visible nodes, and
//! - the projected descendants of any row form one contiguous index range
//!   directly after it, at strictly greater depths.
//!
//! The second invariant is why a subtree can be removed as one block in
//! O(subtree) rather than O(projection).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::{debug, trace};

use crate::bridge::{ListDriver, RowSnapshot};
use crate::error::{Result, TreeError};
use crate::event::{Events, TreeEvent};
use crate::node::{NodeId, NodeSpec, TreePath};
use crate::scroll::{SCROLL_DELAY, ScrollScheduler};
use crate::tree::Tree;

/// One visible row: the node it shows and its depth below the top level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatRow {
    pub id: NodeId,
    pub depth: u16,
}

/// A tree rendered as a flat, animated list.
pub struct TreeList<T> {
    tree: Tree<T>,
    driver: Box<dyn ListDriver<T>>,
    visible: Vec<FlatRow>,
    index_of: HashMap<NodeId, usize>,
    events: Events,
    scheduler: ScrollScheduler,
    disposed: bool,
}

impl<T: Clone> TreeList<T> {
    /// Create a controller over an empty tree.
    pub fn new(driver: Box<dyn ListDriver<T>>) -> Self {
        Self::with_tree(Tree::new(), driver)
    }

    /// Create a controller over an existing tree.
    ///
    /// The initial projection is built in place without driver calls; the
    /// primitive is expected to start out showing these rows (no entrance
    /// animation for rows that were never absent).
    pub fn with_tree(mut tree: Tree<T>, driver: Box<dyn ListDriver<T>>) -> Self {
        let events = tree.subscribe_root();
        let mut list = Self {
            tree,
            driver,
            visible: Vec::new(),
            index_of: HashMap::new(),
            events,
            scheduler: ScrollScheduler::new(SCROLL_DELAY),
            disposed: false,
        };
        let mut rows = Vec::new();
        for child in list.tree.children_of(list.tree.root()).unwrap_or_default() {
            list.flatten_into(child, 0, &mut rows);
        }
        list.visible = rows;
        list.reindex_from(0);
        list
    }

    /// Override the delay before the automatic scroll to new rows.
    pub fn with_scroll_delay(mut self, delay: Duration) -> Self {
        self.scheduler = ScrollScheduler::new(delay);
        self
    }

    // -------------------------------------------------------------------------
    // Mutation (forwarded to the tree, then applied to the projection)
    // -------------------------------------------------------------------------

    /// Append children to `parent`; see [`Tree::add_children`].
    pub fn add_children(&mut self, parent: NodeId, specs: Vec<NodeSpec<T>>) -> Result<Vec<NodeId>> {
        self.ensure_live()?;
        let ids = self.tree.add_children(parent, specs)?;
        self.apply_pending_events();
        Ok(ids)
    }

    /// Insert children at a sibling index; see [`Tree::insert_children`].
    pub fn insert_children(
        &mut self,
        parent: NodeId,
        position: usize,
        specs: Vec<NodeSpec<T>>,
    ) -> Result<Vec<NodeId>> {
        self.ensure_live()?;
        let ids = self.tree.insert_children(parent, position, specs)?;
        self.apply_pending_events();
        Ok(ids)
    }

    /// Detach named children with their subtrees; see
    /// [`Tree::remove_children`].
    pub fn remove_children(&mut self, parent: NodeId, keys: &[&str]) -> Result<Vec<NodeId>> {
        self.ensure_live()?;
        let ids = self.tree.remove_children(parent, keys)?;
        self.apply_pending_events();
        Ok(ids)
    }

    /// Replace a node's payload; see [`Tree::update_value`].
    pub fn update_value(&mut self, node: NodeId, value: T) -> Result<T> {
        self.ensure_live()?;
        let old = self.tree.update_value(node, value)?;
        self.apply_pending_events();
        Ok(old)
    }

    // -------------------------------------------------------------------------
    // Expand / collapse
    // -------------------------------------------------------------------------

    /// Expand a node, revealing its stored subtree.
    ///
    /// If the node is projected, its visible descendants (honoring their own
    /// stored expansion flags) slide in directly after it with entrance
    /// animations, and the deferred scroll targets the first revealed row.
    /// Expanding an already-expanded node is a no-op.
    pub fn expand(&mut self, node: NodeId) -> Result<()> {
        self.set_expanded(node, true)
    }

    /// Collapse a node, hiding its projected descendants.
    ///
    /// The descendants leave as one contiguous block, removed from the
    /// highest index down, each with an exit snapshot. The tree itself is
    /// untouched; the subtree reappears on the next expand. Collapsing an
    /// already-collapsed node is a no-op.
    pub fn collapse(&mut self, node: NodeId) -> Result<()> {
        self.set_expanded(node, false)
    }

    /// Expand or collapse; see [`TreeList::expand`] and
    /// [`TreeList::collapse`].
    pub fn set_expanded(&mut self, node: NodeId, expanded: bool) -> Result<()> {
        self.ensure_live()?;
        if node == self.tree.root() {
            return Err(TreeError::RootNode);
        }
        let previous = self.tree.set_expanded(node, expanded)?;
        if previous == expanded {
            return Ok(());
        }
        let Some(&index) = self.index_of.get(&node) else {
            // Hidden under a collapsed ancestor: the stored flag is all
            // that changes.
            return Ok(());
        };
        if expanded {
            let depth = self.visible[index].depth + 1;
            let mut rows = Vec::new();
            for child in self.tree.children_of(node)? {
                self.flatten_into(child, depth, &mut rows);
            }
            trace!("expand: {} rows after index {index}", rows.len());
            self.insert_run(index + 1, rows);
        } else {
            let span = self.subtree_span(index);
            trace!("collapse: {span} rows after index {index}");
            self.remove_block(index + 1, span);
        }
        Ok(())
    }

    /// Toggle a node's expansion state.
    pub fn toggle(&mut self, node: NodeId) -> Result<()> {
        let expanded = self.tree.is_expanded(node);
        self.set_expanded(node, !expanded)
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Read access to the underlying tree.
    pub fn tree(&self) -> &Tree<T> {
        &self.tree
    }

    /// The hidden root node.
    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    /// Number of visible rows.
    pub fn len(&self) -> usize {
        self.visible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<FlatRow> {
        self.visible.get(index).copied()
    }

    /// The projection, in order.
    pub fn rows(&self) -> &[FlatRow] {
        &self.visible
    }

    /// Current flat position of a node; `None` while the node is hidden by
    /// a collapsed ancestor or not in the tree.
    pub fn index_of(&self, node: NodeId) -> Option<usize> {
        self.index_of.get(&node).copied()
    }

    /// The ordered children of a node; see [`Tree::children_of`].
    pub fn children_of(&self, node: NodeId) -> Result<Vec<NodeId>> {
        self.tree.children_of(node)
    }

    /// Resolve a path of sibling keys; see [`Tree::resolve_path`].
    pub fn resolve_path(&self, path: &TreePath) -> Result<NodeId> {
        self.tree.resolve_path(path)
    }

    /// Build the snapshot a renderer needs for the row at `index`.
    pub fn row_snapshot(&self, index: usize) -> Option<RowSnapshot<T>> {
        let row = self.visible.get(index)?;
        self.snapshot(*row)
    }

    /// Subscribe to tree events at or below `scope`; see
    /// [`Tree::subscribe`].
    pub fn subscribe(&mut self, scope: NodeId) -> Result<Events> {
        self.tree.subscribe(scope)
    }

    // -------------------------------------------------------------------------
    // Deferred scroll
    // -------------------------------------------------------------------------

    /// Fire the deferred scroll if its delay has elapsed.
    ///
    /// Call once per frame. After disposal this is a silent no-op, and a
    /// pending index made stale by later mutations is dropped rather than
    /// clamped.
    pub fn poll_scroll(&mut self) {
        self.poll_scroll_at(Instant::now());
    }

    /// Clock-explicit variant of [`TreeList::poll_scroll`].
    pub fn poll_scroll_at(&mut self, now: Instant) {
        if self.disposed {
            return;
        }
        if let Some(index) = self.scheduler.poll(now) {
            if index < self.visible.len() {
                trace!("deferred scroll to {index}");
                self.driver.scroll_to(index);
            } else {
                trace!("deferred scroll to {index} dropped as stale");
            }
        }
    }

    /// Whether a deferred scroll is waiting to fire.
    pub fn has_pending_scroll(&self) -> bool {
        self.scheduler.is_pending()
    }

    // -------------------------------------------------------------------------
    // Teardown
    // -------------------------------------------------------------------------

    /// Tear the controller down: cancel the subscription and any pending
    /// scroll. Further mutations fail with [`TreeError::Disposed`]; reads
    /// keep answering from the last state. Disposing twice is a no-op.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        debug!("tree list disposed");
        self.disposed = true;
        self.scheduler.cancel();
        self.events.cancel();
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn ensure_live(&self) -> Result<()> {
        if self.disposed {
            return Err(TreeError::Disposed);
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Event application
    // -------------------------------------------------------------------------

    fn apply_pending_events(&mut self) {
        while let Some(event) = self.events.try_next() {
            self.apply_event(event);
        }
    }

    fn apply_event(&mut self, event: TreeEvent) {
        match event {
            TreeEvent::Added { parent, nodes } => {
                let Some(anchor) = self.append_anchor(parent) else {
                    return;
                };
                let rows = self.flatten_nodes(parent, &nodes);
                trace!("add: {} rows at index {anchor}", rows.len());
                self.insert_run(anchor, rows);
            }
            TreeEvent::Inserted {
                parent,
                position,
                nodes,
            } => {
                let Some(anchor) = self.insert_anchor(parent, position, nodes.len()) else {
                    return;
                };
                let rows = self.flatten_nodes(parent, &nodes);
                trace!("insert: {} rows at index {anchor}", rows.len());
                self.insert_run(anchor, rows);
            }
            TreeEvent::Removed { nodes, .. } => {
                // Each removed node that was visible owns one contiguous
                // block. Blocks are taken out from the back of the list so
                // the earlier indices stay valid throughout.
                let mut blocks: Vec<(usize, usize)> = nodes
                    .iter()
                    .filter_map(|node| self.index_of.get(node).copied())
                    .map(|index| (index, 1 + self.subtree_span(index)))
                    .collect();
                blocks.sort_unstable_by(|a, b| b.0.cmp(&a.0));
                for (start, len) in blocks {
                    trace!("remove: block of {len} rows at index {start}");
                    self.remove_block(start, len);
                }
            }
            TreeEvent::Updated { node } => {
                if let Some(&index) = self.index_of.get(&node) {
                    self.driver.refresh_at(index);
                }
            }
        }
    }

    /// Whether mutations under `parent` are visible right now: the parent
    /// is the root, or is itself projected and expanded.
    fn parent_visible(&self, parent: NodeId) -> bool {
        parent == self.tree.root()
            || (self.index_of.contains_key(&parent) && self.tree.is_expanded(parent))
    }

    /// Index directly after `parent`'s existing visible subtree, where
    /// appended children land. `None` when the mutation is hidden.
    fn append_anchor(&self, parent: NodeId) -> Option<usize> {
        if !self.parent_visible(parent) {
            return None;
        }
        if parent == self.tree.root() {
            return Some(self.visible.len());
        }
        let index = self.index_of[&parent];
        Some(index + 1 + self.subtree_span(index))
    }

    /// Index in front of the sibling that ended up directly after the
    /// inserted run; inserting at the end degenerates to append placement.
    fn insert_anchor(&self, parent: NodeId, position: usize, count: usize) -> Option<usize> {
        if !self.parent_visible(parent) {
            return None;
        }
        let siblings = self.tree.children_of(parent).ok()?;
        match siblings.get(position + count) {
            Some(following) => self.index_of.get(following).copied(),
            None => self.append_anchor(parent),
        }
    }

    /// Pre-order rows for freshly inserted nodes, honoring their stored
    /// expansion flags.
    fn flatten_nodes(&self, parent: NodeId, nodes: &[NodeId]) -> Vec<FlatRow> {
        let depth = if parent == self.tree.root() {
            0
        } else {
            self.visible[self.index_of[&parent]].depth + 1
        };
        let mut rows = Vec::new();
        for &node in nodes {
            self.flatten_into(node, depth, &mut rows);
        }
        rows
    }

    fn flatten_into(&self, node: NodeId, depth: u16, out: &mut Vec<FlatRow>) {
        out.push(FlatRow { id: node, depth });
        if self.tree.is_expanded(node) {
            for child in self.tree.children_of(node).unwrap_or_default() {
                self.flatten_into(child, depth + 1, out);
            }
        }
    }

    /// Number of projected descendants of the row at `index`: the run of
    /// following rows at strictly greater depth.
    fn subtree_span(&self, index: usize) -> usize {
        let depth = self.visible[index].depth;
        self.visible[index + 1..]
            .iter()
            .take_while(|row| row.depth > depth)
            .count()
    }

    /// Splice `rows` into the projection at `at`, driving one entrance
    /// animation per row (ascending) and scheduling the deferred scroll to
    /// the first new row.
    fn insert_run(&mut self, at: usize, rows: Vec<FlatRow>) {
        if rows.is_empty() {
            return;
        }
        let count = rows.len();
        self.visible.splice(at..at, rows);
        self.reindex_from(at);
        for index in at..at + count {
            self.driver.insert_at(index);
        }
        self.scheduler.schedule(at, Instant::now());
    }

    /// Remove `len` rows starting at `start`, from the highest index down
    /// so the remaining indices stay valid, handing the driver an exit
    /// snapshot per row.
    fn remove_block(&mut self, start: usize, len: usize) {
        for index in (start..start + len).rev() {
            let row = self.visible.remove(index);
            self.index_of.remove(&row.id);
            if let Some(snapshot) = self.snapshot(row) {
                self.driver.remove_at(index, snapshot);
            }
        }
        self.reindex_from(start);
    }

    /// Capture a row's last-known appearance. Works for detached nodes:
    /// the arena keeps their key and payload readable.
    fn snapshot(&self, row: FlatRow) -> Option<RowSnapshot<T>> {
        Some(RowSnapshot {
            key: self.tree.key_of(row.id)?.to_string(),
            value: self.tree.value(row.id)?.clone(),
            depth: row.depth,
        })
    }

    fn reindex_from(&mut self, start: usize) {
        for index in start..self.visible.len() {
            self.index_of.insert(self.visible[index].id, index);
        }
    }
}
