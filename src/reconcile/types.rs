//! Reconciler configuration and classification types (§4.6, §6).

use serde::{Deserialize, Serialize};

/// Where reconcile writes flow (§6 `SyncSettings`, GLOSSARY `Direction`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    UpstreamToProvider,
    ProviderToUpstream,
    Bidirectional,
}

/// The per-`(tenant, provider)` reconcile strategy (§4.6, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReconcileStrategy {
    AutoApply,
    ManualReview,
    Ignore,
}

/// `{direction, strategy, intervalMinutes}` (§6 Configuration surface).
#[derive(Debug, Clone, Copy)]
pub struct SyncSettings {
    pub direction: Direction,
    pub strategy: ReconcileStrategy,
    pub interval_minutes: i64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            direction: Direction::UpstreamToProvider,
            strategy: ReconcileStrategy::AutoApply,
            interval_minutes: 15,
        }
    }
}

/// Which side changed relative to `lastKnownState`, for a one-sided drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangedSide {
    Upstream,
    Provider,
}

/// The three-way compare classification (§4.6 table). `NoDrift` and the
/// two one-sided cases are reconcilable by the configured strategy;
/// `DualModification`/`DeleteModifyConflict`/`UniquenessViolation` force
/// `MANUAL_REVIEW` regardless of configured strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreeWayClassification {
    NoDrift,
    OneSided(ChangedSide),
    DualModification,
    DeleteModifyConflict,
    UniquenessViolation,
}

impl ThreeWayClassification {
    /// Whether this classification forces `MANUAL_REVIEW` regardless of
    /// the configured strategy (§4.6 table).
    pub fn forces_manual_review(&self) -> bool {
        matches!(
            self,
            ThreeWayClassification::DualModification
                | ThreeWayClassification::DeleteModifyConflict
                | ThreeWayClassification::UniquenessViolation
        )
    }
}

/// Outcome of attempting to reconcile a single resource (§4.6, §4.7).
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// The three-way compare found no drift; nothing to do.
    NoDrift,
    /// `AUTO_APPLY` pushed the change and the drift entry is now
    /// reconciled.
    Applied,
    /// The drift was classified (forced or configured) as requiring
    /// manual review; a new `ConflictLogEntry` was appended.
    Quarantined { conflict_id: String },
    /// An unresolved conflict already exists for this resource id; no
    /// further auto-reconcile action was taken (§8 invariant).
    BlockedByExistingConflict { conflict_id: String },
    /// `IGNORE` strategy: drift logged, both sides left unchanged.
    Ignored,
}
