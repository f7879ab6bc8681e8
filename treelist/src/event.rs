//! Mutation events and subscriber streams.
//!
//! Every successful structural mutation emits exactly one event, delivered
//! synchronously to every live subscriber whose scope contains the anchor
//! node. There is no replay for late subscribers and no backpressure; each
//! subscriber owns an unbounded queue it is expected to drain promptly.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, Weak};

use crate::node::NodeId;

/// A structural or payload change to the tree.
///
/// `Added`, `Inserted`, and `Removed` are anchored at the parent whose child
/// list changed; `Updated` is anchored at the changed node itself. For
/// `Inserted`, the node order defines the final relative sibling order and
/// `position` is the (clamped) index of the first inserted node among the
/// parent's previous children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEvent {
    Added {
        parent: NodeId,
        nodes: Vec<NodeId>,
    },
    Inserted {
        parent: NodeId,
        position: usize,
        nodes: Vec<NodeId>,
    },
    Removed {
        parent: NodeId,
        nodes: Vec<NodeId>,
    },
    Updated {
        node: NodeId,
    },
}

impl TreeEvent {
    /// The node this event is anchored at, for subscription scoping.
    pub fn anchor(&self) -> NodeId {
        match self {
            TreeEvent::Added { parent, .. }
            | TreeEvent::Inserted { parent, .. }
            | TreeEvent::Removed { parent, .. } => *parent,
            TreeEvent::Updated { node } => *node,
        }
    }
}

type EventQueue = Arc<Mutex<VecDeque<TreeEvent>>>;

/// A stream of events scoped to one subtree.
///
/// Dropping the stream cancels the subscription; `cancel` does the same
/// explicitly and is idempotent. Cancellation never affects the tree or
/// other subscribers.
#[derive(Debug)]
pub struct Events {
    queue: EventQueue,
    cancelled: bool,
}

impl Events {
    /// Pop the oldest pending event, if any.
    pub fn try_next(&self) -> Option<TreeEvent> {
        self.queue.lock().ok()?.pop_front()
    }

    /// Take all pending events at once.
    pub fn drain(&self) -> Vec<TreeEvent> {
        self.queue
            .lock()
            .map(|mut queue| queue.drain(..).collect())
            .unwrap_or_default()
    }

    /// Stop delivery. Pending undelivered events are discarded.
    pub fn cancel(&mut self) {
        if self.cancelled {
            return;
        }
        self.cancelled = true;
        // Dropping the shared queue is what detaches us from the notifier;
        // its weak reference dies and the entry is pruned on the next emit.
        self.queue = Arc::new(Mutex::new(VecDeque::new()));
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn len(&self) -> usize {
        self.queue.lock().map(|queue| queue.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug)]
struct Subscriber {
    scope: NodeId,
    queue: Weak<Mutex<VecDeque<TreeEvent>>>,
}

/// Explicit subscriber list for one tree.
#[derive(Debug, Default)]
pub(crate) struct Notifier {
    subscribers: Vec<Subscriber>,
}

impl Notifier {
    pub fn subscribe(&mut self, scope: NodeId) -> Events {
        let queue = Arc::new(Mutex::new(VecDeque::new()));
        self.subscribers.push(Subscriber {
            scope,
            queue: Arc::downgrade(&queue),
        });
        Events {
            queue,
            cancelled: false,
        }
    }

    /// Deliver one event to every live subscriber whose scope is the anchor
    /// or one of its ancestors.
    pub fn emit(&mut self, event: &TreeEvent, anchor_chain: &HashSet<NodeId>) {
        self.subscribers.retain(|sub| sub.queue.strong_count() > 0);
        for sub in &self.subscribers {
            if !anchor_chain.contains(&sub.scope) {
                continue;
            }
            if let Some(queue) = sub.queue.upgrade()
                && let Ok(mut queue) = queue.lock()
            {
                queue.push_back(event.clone());
            }
        }
    }

    /// Number of subscriptions that have not been cancelled or dropped.
    pub fn live_count(&mut self) -> usize {
        self.subscribers.retain(|sub| sub.queue.strong_count() > 0);
        self.subscribers.len()
    }
}
