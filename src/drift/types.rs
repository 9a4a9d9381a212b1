//! Drift Log Entry (§3).

use chrono::{DateTime, Utc};
use serde_json::Value;

/// The five drift classifications (§4.5). `AttributeMismatch` is a
/// relabeling the reconciler's three-way compare applies on top of
/// `Modified` when the upstream value also differs from last-known
/// (§4.5 point 5) — it is never produced by the detector directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftType {
    Added,
    Modified,
    Deleted,
    AttributeMismatch,
    MembershipMismatch,
}

/// `{resourceId, resourceType, driftType, oldValue?, newValue?,
/// detectedAt, reconciled, reconciledAt?, reconciliationAction?}` (§3).
#[derive(Debug, Clone, PartialEq)]
pub struct DriftLogEntry {
    pub resource_id: String,
    pub resource_type: String,
    pub drift_type: DriftType,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    pub detected_at: DateTime<Utc>,
    pub reconciled: bool,
    pub reconciled_at: Option<DateTime<Utc>>,
    pub reconciliation_action: Option<String>,
}

impl DriftLogEntry {
    pub fn new(
        resource_id: impl Into<String>,
        resource_type: impl Into<String>,
        drift_type: DriftType,
        old_value: Option<Value>,
        new_value: Option<Value>,
        detected_at: DateTime<Utc>,
    ) -> Self {
        Self {
            resource_id: resource_id.into(),
            resource_type: resource_type.into(),
            drift_type,
            old_value,
            new_value,
            detected_at,
            reconciled: false,
            reconciled_at: None,
            reconciliation_action: None,
        }
    }

    pub fn mark_reconciled(&mut self, action: impl Into<String>, at: DateTime<Utc>) {
        self.reconciled = true;
        self.reconciled_at = Some(at);
        self.reconciliation_action = Some(action.into());
    }

    /// Relabel a `Modified` entry as `AttributeMismatch` (§4.5 point 5).
    pub fn into_attribute_mismatch(mut self) -> Self {
        if self.drift_type == DriftType::Modified {
            self.drift_type = DriftType::AttributeMismatch;
        }
        self
    }
}
