// src/watch/snapshot.rs — Last observed snapshot, kept for the next diff

use crate::upstream::SnapshotMap;

/// Holds the snapshot from the most recent successful poll.
///
/// Owned by the watcher; nothing else reads or writes it.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: SnapshotMap,
    polls: u64,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &SnapshotMap {
        &self.current
    }

    /// Install `next` as the baseline and hand back the one it replaces.
    pub fn replace(&mut self, next: SnapshotMap) -> SnapshotMap {
        self.polls += 1;
        std::mem::replace(&mut self.current, next)
    }

    /// Number of snapshots installed so far.
    pub fn polls(&self) -> u64 {
        self.polls
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }
}
