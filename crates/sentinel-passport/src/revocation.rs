//! Revocation Registry (C2): a set of revoked passport `jti`s, diffable
//! and snapshotted for the edge sync pull.

use parking_lot::RwLock;
use std::collections::HashSet;

/// Monotonic snapshot identifier. Bumped on every `Add`.
pub type SnapshotId = u64;

/// In-memory revoked-`jti` set with snapshot/diff semantics.
///
/// Entries are monotonic: `Add` never removes anything. Garbage
/// collection of expired entries is an explicit offline operation, out
/// of the pipeline's path.
pub struct RevocationRegistry {
    inner: RwLock<Inner>,
}

struct Inner {
    jtis: HashSet<String>,
    /// `jtis` in insertion order, paired with the snapshot id active when
    /// they were added. Used to answer `DiffSince`.
    timeline: Vec<(SnapshotId, String)>,
    snapshot_id: SnapshotId,
}

impl Default for RevocationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RevocationRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                jtis: HashSet::new(),
                timeline: Vec::new(),
                snapshot_id: 0,
            }),
        }
    }

    /// Add a `jti` to the revoked set. Idempotent.
    pub fn add(&self, jti: impl Into<String>) {
        let jti = jti.into();
        let mut inner = self.inner.write();
        if inner.jtis.insert(jti.clone()) {
            inner.snapshot_id += 1;
            let id = inner.snapshot_id;
            inner.timeline.push((id, jti));
        }
    }

    /// Is this `jti` currently revoked?
    pub fn contains(&self, jti: &str) -> bool {
        self.inner.read().jtis.contains(jti)
    }

    /// Return the current snapshot id and the full revoked set.
    pub fn snapshot(&self) -> (SnapshotId, Vec<String>) {
        let inner = self.inner.read();
        (inner.snapshot_id, inner.jtis.iter().cloned().collect())
    }

    /// Return every `jti` added after `since`. Applying diffs from every
    /// `snapshot_id` in order must yield the same set as `snapshot()`
    /// from the latest id.
    ///
    /// Returns `None` on a sequence gap (requested snapshot predates what
    /// this registry retains) — callers must fall back to a full
    /// snapshot in that case.
    pub fn diff_since(&self, since: SnapshotId) -> Option<Vec<String>> {
        let inner = self.inner.read();
        if since > inner.snapshot_id {
            return None;
        }
        let oldest_retained = inner.timeline.first().map(|(id, _)| *id - 1).unwrap_or(0);
        if since < oldest_retained {
            return None;
        }
        Some(
            inner
                .timeline
                .iter()
                .filter(|(id, _)| *id > since)
                .map(|(_, jti)| jti.clone())
                .collect(),
        )
    }

    pub fn current_snapshot_id(&self) -> SnapshotId {
        self.inner.read().snapshot_id
    }
}
