//! Bridge to the external animated-list primitive.
//!
//! The controller never renders anything; it tells a [`ListDriver`] where
//! rows appeared and disappeared, and the driver runs the entrance and exit
//! animations. Removed rows are handed over as [`RowSnapshot`]s captured
//! before the row left the projection, since by then the node is no longer
//! addressable by index.

use std::sync::{Arc, Mutex};

use crate::config::TreeListConfig;

/// Last-known appearance of a row, for exit animations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSnapshot<T> {
    /// Sibling key of the node the row showed.
    pub key: String,
    /// Payload at the moment of removal.
    pub value: T,
    /// Depth below the top level (top-level rows are depth 0).
    pub depth: u16,
}

impl<T> RowSnapshot<T> {
    /// Indentation in cells under the given presentation config.
    pub fn indentation(&self, config: &TreeListConfig) -> u16 {
        self.depth * config.indent_width
    }
}

/// The animated-list operations the controller drives.
///
/// `insert_at` must make the primitive report one more row at `index` with
/// an entrance animation. `remove_at` runs the exit animation, painting the
/// supplied snapshot. `scroll_to` is best effort: the index may be stale by
/// the time a deferred call fires, and a stale call is a no-op, not an
/// error. `refresh_at` is a pure re-render signal for payload updates and
/// defaults to doing nothing.
pub trait ListDriver<T> {
    fn insert_at(&mut self, index: usize);
    fn remove_at(&mut self, index: usize, row: RowSnapshot<T>);
    fn scroll_to(&mut self, index: usize);
    fn refresh_at(&mut self, _index: usize) {}
}

/// One recorded driver call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall<T> {
    Insert(usize),
    Remove { index: usize, row: RowSnapshot<T> },
    Scroll(usize),
    Refresh(usize),
}

/// A driver that records every call.
///
/// Useful headless and in tests: clone the driver before boxing it up and
/// inspect the shared log afterwards.
///
/// # Example
///
/// ```ignore
/// let driver = RecordingDriver::new();
/// let mut list = TreeList::new(Box::new(driver.clone()));
/// list.add_children(list.root(), vec![NodeSpec::new("a", 1)])?;
/// assert_eq!(driver.take(), vec![DriverCall::Insert(0)]);
/// ```
#[derive(Debug)]
pub struct RecordingDriver<T> {
    log: Arc<Mutex<Vec<DriverCall<T>>>>,
}

impl<T> RecordingDriver<T> {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Snapshot of the calls so far.
    pub fn calls(&self) -> Vec<DriverCall<T>>
    where
        T: Clone,
    {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    /// Take and clear the recorded calls.
    pub fn take(&self) -> Vec<DriverCall<T>> {
        self.log
            .lock()
            .map(|mut log| log.drain(..).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.log.lock().map(|log| log.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record(&self, call: DriverCall<T>) {
        if let Ok(mut log) = self.log.lock() {
            log.push(call);
        }
    }
}

impl<T> Default for RecordingDriver<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for RecordingDriver<T> {
    fn clone(&self) -> Self {
        Self {
            log: Arc::clone(&self.log),
        }
    }
}

impl<T> ListDriver<T> for RecordingDriver<T> {
    fn insert_at(&mut self, index: usize) {
        self.record(DriverCall::Insert(index));
    }

    fn remove_at(&mut self, index: usize, row: RowSnapshot<T>) {
        self.record(DriverCall::Remove { index, row });
    }

    fn scroll_to(&mut self, index: usize) {
        self.record(DriverCall::Scroll(index));
    }

    fn refresh_at(&mut self, index: usize) {
        self.record(DriverCall::Refresh(index));
    }
}
