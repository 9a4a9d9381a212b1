//! Conflict Log Entry (§3), shared between the transformation engine's
//! `MANUAL_REVIEW` strategy (§4.4, `TransformationConflict`) and the
//! reconciler's three-way compare (§4.6, the other three variants).
//!
//! Field naming note: spec.md's data model names the upstream-side field
//! `entraChange` (a leftover from the original gateway's Microsoft Entra
//! ID-specific origin); every other entity in this crate speaks of
//! "upstream" generically, so this type follows suit as `upstream_change`.

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

/// The conflict classifications (§3, §4.6). The first three are forced by
/// the reconciler's three-way compare regardless of configured strategy;
/// `TransformationConflict` comes from the transformation engine's
/// `MANUAL_REVIEW` resolution; `PolicyReview` covers a one-sided drift that
/// a `(tenant, provider)`'s configured `MANUAL_REVIEW` strategy routes to
/// review even though the three-way compare found no conflict on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictType {
    DualModification,
    DeleteModifyConflict,
    UniquenessViolation,
    TransformationConflict,
    PolicyReview,
}

/// Resolution actions an admin can take on an unresolved conflict (§4.6).
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionAction {
    ApplyUpstream,
    ApplyProvider,
    Custom(String),
    Ignore,
}

/// `{conflictId, resourceId, conflictType, entraChange, providerChange,
/// suggestedResolution, resolved, resolvedAt?, resolvedBy?, resolution?,
/// detectedAt}` (§3).
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictLogEntry {
    pub conflict_id: String,
    pub resource_id: String,
    /// `"User"` or `"Group"`, used to dispatch resolution actions to the
    /// right adapter method (§4.6).
    pub resource_type: String,
    pub conflict_type: ConflictType,
    pub upstream_change: Option<Value>,
    pub provider_change: Option<Value>,
    /// Per §9 Open Questions, `SuggestedResolution="MANUAL_REVIEW"`
    /// overlaps with the strategy enum value; both denote "strategy
    /// forced to manual review by a detected conflict".
    pub suggested_resolution: String,
    pub resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,
    pub resolution: Option<ResolutionAction>,
    pub detected_at: DateTime<Utc>,
}

impl ConflictLogEntry {
    pub fn new(
        resource_id: impl Into<String>,
        resource_type: impl Into<String>,
        conflict_type: ConflictType,
        suggested_resolution: impl Into<String>,
        detected_at: DateTime<Utc>,
    ) -> Self {
        Self {
            conflict_id: Uuid::new_v4().to_string(),
            resource_id: resource_id.into(),
            resource_type: resource_type.into(),
            conflict_type,
            upstream_change: None,
            provider_change: None,
            suggested_resolution: suggested_resolution.into(),
            resolved: false,
            resolved_at: None,
            resolved_by: None,
            resolution: None,
            detected_at,
        }
    }

    pub fn with_changes(mut self, upstream: Option<Value>, provider: Option<Value>) -> Self {
        self.upstream_change = upstream;
        self.provider_change = provider;
        self
    }

    /// Mark resolved per §4.6 ("the action is executed (except `IGNORE`)
    /// and the conflict is marked resolved with `{resolvedAt, resolvedBy,
    /// resolution}`").
    pub fn resolve(&mut self, action: ResolutionAction, resolved_by: impl Into<String>, resolved_at: DateTime<Utc>) {
        self.resolution = Some(action);
        self.resolved_by = Some(resolved_by.into());
        self.resolved_at = Some(resolved_at);
        self.resolved = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_resolve_marks_entry_resolved() {
        let mut entry = ConflictLogEntry::new(
            "group-1",
            "Group",
            ConflictType::TransformationConflict,
            "MANUAL_REVIEW",
            Utc::now(),
        );
        assert!(!entry.resolved);
        entry.resolve(ResolutionAction::ApplyUpstream, "admin@example.com", Utc::now());
        assert!(entry.resolved);
        assert_eq!(entry.resolved_by.as_deref(), Some("admin@example.com"));
    }
}
