//! Sync State (§3) and the cooperative cancellation primitive (§5, SPEC_FULL
//! §2 Ambient stack).

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::watch;

use crate::drift::DriftLogEntry;
use crate::transform::ConflictLogEntry;

/// `{Idle, InProgress, Completed, CompletedWithErrors, Failed}` (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Idle,
    InProgress,
    Completed,
    CompletedWithErrors,
    Failed,
}

/// `{status, lastSyncTimestamp, snapshotTimestamp, snapshotChecksum,
/// lastKnownState, userCount, groupCount, driftLog[], conflictLog[],
/// errorLog[]}` (§3). Owned by the polling service for its `(tenant,
/// provider)` key; the reconciler mutates it under that key's lock (§3
/// Ownership, §5 Shared-resource policy). Log lists are append-only
/// under the lock; readers take a [`SyncStateSnapshot`] rather than
/// iterate live.
#[derive(Debug, Clone)]
pub struct SyncState {
    pub status: SyncStatus,
    pub last_sync_timestamp: Option<DateTime<Utc>>,
    pub snapshot_timestamp: Option<DateTime<Utc>>,
    pub snapshot_checksum: Option<String>,
    /// Last-known resource snapshot, by resource type then resource id,
    /// normalized (§4.5). Serialized JSON per §6 Persisted state layout.
    pub last_known_state: HashMap<String, HashMap<String, Value>>,
    pub user_count: usize,
    pub group_count: usize,
    pub drift_log: Vec<DriftLogEntry>,
    pub conflict_log: Vec<ConflictLogEntry>,
    pub error_log: Vec<String>,
}

impl Default for SyncState {
    fn default() -> Self {
        Self {
            status: SyncStatus::Idle,
            last_sync_timestamp: None,
            snapshot_timestamp: None,
            snapshot_checksum: None,
            last_known_state: HashMap::new(),
            user_count: 0,
            group_count: 0,
            drift_log: Vec::new(),
            conflict_log: Vec::new(),
            error_log: Vec::new(),
        }
    }
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resource ids with an unresolved conflict; these are blocked from
    /// further auto-reconcile action until resolution (§8 invariant).
    pub fn unresolved_conflict_resource_ids(&self) -> HashSet<String> {
        self.conflict_log
            .iter()
            .filter(|c| !c.resolved)
            .map(|c| c.resource_id.clone())
            .collect()
    }

    /// A read-only snapshot of the append-only logs, for readers that
    /// must not observe a partially-updated list mid-tick (§5).
    pub fn snapshot(&self) -> SyncStateSnapshot {
        SyncStateSnapshot {
            status: self.status,
            last_sync_timestamp: self.last_sync_timestamp,
            snapshot_timestamp: self.snapshot_timestamp,
            snapshot_checksum: self.snapshot_checksum.clone(),
            user_count: self.user_count,
            group_count: self.group_count,
            drift_log: self.drift_log.clone(),
            conflict_log: self.conflict_log.clone(),
            error_log: self.error_log.clone(),
        }
    }
}

/// An immutable point-in-time copy of [`SyncState`]'s reportable fields.
#[derive(Debug, Clone)]
pub struct SyncStateSnapshot {
    pub status: SyncStatus,
    pub last_sync_timestamp: Option<DateTime<Utc>>,
    pub snapshot_timestamp: Option<DateTime<Utc>>,
    pub snapshot_checksum: Option<String>,
    pub user_count: usize,
    pub group_count: usize,
    pub drift_log: Vec<DriftLogEntry>,
    pub conflict_log: Vec<ConflictLogEntry>,
    pub error_log: Vec<String>,
}

/// Hand-rolled cancellation primitive built on `tokio::sync::watch`
/// (SPEC_FULL §2: `tokio_util::sync::CancellationToken` isn't in the
/// dependency tree, so cancellation is modeled explicitly). Every
/// suspending operation in the poll/reconcile path accepts a
/// [`CancellationToken`] and should check it at its next suspension
/// point (§5 Cancellation).
#[derive(Debug, Clone)]
pub struct CancellationToken {
    rx: watch::Receiver<bool>,
}

/// The paired sender half; `cancel()` is typically called from outside
/// the tick (an admin action or shutdown signal).
#[derive(Debug, Clone)]
pub struct CancellationSignal {
    tx: watch::Sender<bool>,
}

impl CancellationSignal {
    pub fn new() -> (Self, CancellationToken) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, CancellationToken { rx })
    }

    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

impl CancellationToken {
    /// A token that never cancels, for callers that don't need the seam.
    pub fn never() -> Self {
        let (_signal, token) = CancellationSignal::new();
        token
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::transform::ConflictType;

    #[test]
    fn test_unresolved_conflict_ids_excludes_resolved() {
        let mut state = SyncState::new();
        let mut resolved = ConflictLogEntry::new("r1", "User", ConflictType::DualModification, "MANUAL_REVIEW", Utc::now());
        resolved.resolve(
            crate::transform::ResolutionAction::Ignore,
            "admin",
            Utc::now(),
        );
        state.conflict_log.push(resolved);
        state
            .conflict_log
            .push(ConflictLogEntry::new("r2", "User", ConflictType::DualModification, "MANUAL_REVIEW", Utc::now()));

        let blocked = state.unresolved_conflict_resource_ids();
        assert!(!blocked.contains("r1"));
        assert!(blocked.contains("r2"));
    }

    #[test]
    fn test_cancellation_signal_propagates() {
        let (signal, token) = CancellationSignal::new();
        assert!(!token.is_cancelled());
        signal.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_never_cancelled_token() {
        assert!(!CancellationToken::never().is_cancelled());
    }
}
