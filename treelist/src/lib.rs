//! A hierarchical tree rendered as one flat, animated, scrollable list.
//!
//! The tree is mutable while displayed: children can be added, inserted,
//! and removed, and subtrees expanded or collapsed. [`TreeList`] keeps the
//! flat projection of visible nodes continuously consistent with those
//! mutations, resolves "where is this node right now" in better than linear
//! time, and drives an external animated-list primitive (via [`ListDriver`])
//! with position-accurate insert, remove, and deferred scroll-to-index
//! calls. Rendering itself is out of scope: the driver owns pixels, this
//! crate owns positions.

pub mod bridge;
pub mod config;
pub mod error;
pub mod event;
pub mod node;
pub mod projection;
pub mod scroll;
pub mod tree;

pub use bridge::{DriverCall, ListDriver, RecordingDriver, RowSnapshot};
pub use config::TreeListConfig;
pub use error::{Result, TreeError};
pub use event::{Events, TreeEvent};
pub use node::{NodeId, NodeSpec, TreePath};
pub use projection::{FlatRow, TreeList};
pub use scroll::SCROLL_DELAY;
pub use tree::Tree;
