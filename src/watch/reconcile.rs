// src/watch/reconcile.rs — Started/ended sets between two snapshots

use std::collections::HashSet;

use crate::upstream::{Session, SnapshotMap};

/// Sessions that appeared or disappeared between two polls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transitions {
    pub started: Vec<Session>,
    pub ended: Vec<Session>,
}

impl Transitions {
    pub fn is_empty(&self) -> bool {
        self.started.is_empty() && self.ended.is_empty()
    }
}

/// Diff two snapshots by session id only.
///
/// Field changes on a session present in both (title edits and the like) are
/// ignored. Output is ordered by start time, then id, so callers see a stable
/// order regardless of map iteration.
pub fn reconcile(previous: &SnapshotMap, current: &SnapshotMap) -> Transitions {
    let mut started: Vec<Session> = current
        .values()
        .filter(|s| !previous.contains_key(&s.session_id))
        .cloned()
        .collect();
    let mut ended: Vec<Session> = previous
        .values()
        .filter(|s| !current.contains_key(&s.session_id))
        .cloned()
        .collect();

    started.sort_by(chronological);
    ended.sort_by(chronological);
    Transitions { started, ended }
}

fn chronological(a: &Session, b: &Session) -> std::cmp::Ordering {
    a.started_at_ms
        .cmp(&b.started_at_ms)
        .then_with(|| a.session_id.cmp(&b.session_id))
}

/// Which owners' sessions get persisted and enriched.
///
/// Every session still goes into the snapshot; the filter only decides what
/// is handed downstream.
#[derive(Debug, Clone, Default)]
pub struct OwnerFilter {
    owners: HashSet<i64>,
}

impl OwnerFilter {
    /// An empty list admits everyone.
    pub fn new(owners: impl IntoIterator<Item = i64>) -> Self {
        Self {
            owners: owners.into_iter().collect(),
        }
    }

    pub fn admits(&self, owner_id: i64) -> bool {
        self.owners.is_empty() || self.owners.contains(&owner_id)
    }

    pub fn is_unrestricted(&self) -> bool {
        self.owners.is_empty()
    }

    pub fn apply(&self, transitions: Transitions) -> Transitions {
        if self.is_unrestricted() {
            return transitions;
        }
        Transitions {
            started: transitions
                .started
                .into_iter()
                .filter(|s| self.admits(s.owner_id))
                .collect(),
            ended: transitions
                .ended
                .into_iter()
                .filter(|s| self.admits(s.owner_id))
                .collect(),
        }
    }
}
