//! Three-way compare and directional apply (§4.6).
//!
//! The reconciler is deliberately stateless like the change detector
//! (§4.5): callers own the sync state (drift log, conflict log, the set
//! of resource ids currently blocked by an unresolved conflict) and pass
//! mutable references in per call. [`crate::poll::PollingService`] is the
//! only caller in this crate; it holds that state under its per-`(tenant,
//! provider)` lock for the whole tick (§5).

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::adapter::traits::Adapter;
use crate::drift::content_hash;
use crate::error::{AdapterError, ReconcileError, ReconcileResult, ScimErrorKind};
use crate::transform::{ConflictLogEntry, ConflictType};

use super::types::{ChangedSide, Direction, ReconcileOutcome, ReconcileStrategy, ThreeWayClassification};

fn eq_opt(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => content_hash(x) == content_hash(y),
        _ => false,
    }
}

/// Classify a resource's three-way state per the §4.6 table.
pub fn classify(
    last_known: Option<&Value>,
    upstream: Option<&Value>,
    provider: Option<&Value>,
) -> ThreeWayClassification {
    if upstream.is_none() && last_known.is_some() && !eq_opt(last_known, provider) {
        return ThreeWayClassification::DeleteModifyConflict;
    }

    if last_known.is_none() {
        // First-sync seeding: there is no recorded baseline, so neither
        // side can be said to have "changed since" it. A resource already
        // present on both sides with matching content is not drift at
        // all; if the content differs, there is no history to prove both
        // sides independently modified it, so it is seeded as a one-sided
        // upstream change rather than quarantined as DUAL_MODIFICATION.
        return match (upstream, provider) {
            (None, None) => ThreeWayClassification::NoDrift,
            (Some(_), None) => ThreeWayClassification::OneSided(ChangedSide::Upstream),
            (None, Some(_)) => ThreeWayClassification::OneSided(ChangedSide::Provider),
            (Some(_), Some(_)) if eq_opt(upstream, provider) => ThreeWayClassification::NoDrift,
            (Some(_), Some(_)) => ThreeWayClassification::OneSided(ChangedSide::Upstream),
        };
    }

    let upstream_changed = !eq_opt(last_known, upstream);
    let provider_changed = !eq_opt(last_known, provider);

    match (upstream_changed, provider_changed) {
        (false, false) => ThreeWayClassification::NoDrift,
        (true, false) => ThreeWayClassification::OneSided(ChangedSide::Upstream),
        (false, true) => ThreeWayClassification::OneSided(ChangedSide::Provider),
        (true, true) => ThreeWayClassification::DualModification,
    }
}

/// A stateless reconciler over the three-way compare and the configured
/// strategy/direction (§4.6).
#[derive(Debug, Default, Clone, Copy)]
pub struct Reconciler;

impl Reconciler {
    pub fn new() -> Self {
        Self
    }

    /// Reconcile one resource. `conflict_log` receives a new entry when
    /// the classification forces, or the configured strategy chooses,
    /// `MANUAL_REVIEW`. `blocked` is the set of resource ids with an
    /// existing unresolved conflict (§8 invariant: no further auto-
    /// reconcile action until resolution).
    #[allow(clippy::too_many_arguments)]
    pub async fn reconcile_resource(
        &self,
        resource_type: &str,
        resource_id: &str,
        last_known: Option<&Value>,
        upstream: Option<&Value>,
        provider: Option<&Value>,
        direction: Direction,
        strategy: ReconcileStrategy,
        upstream_adapter: &dyn Adapter,
        provider_adapter: &dyn Adapter,
        conflict_log: &mut Vec<ConflictLogEntry>,
        blocked: &HashSet<String>,
        now: DateTime<Utc>,
    ) -> ReconcileResult<ReconcileOutcome> {
        if blocked.contains(resource_id) {
            // Find the still-unresolved entry to report back (§8 invariant).
            let conflict_id = conflict_log
                .iter()
                .rev()
                .find(|c| c.resource_id == resource_id && !c.resolved)
                .map(|c| c.conflict_id.clone())
                .unwrap_or_default();
            return Ok(ReconcileOutcome::BlockedByExistingConflict { conflict_id });
        }

        let classification = classify(last_known, upstream, provider);

        if classification == ThreeWayClassification::NoDrift {
            return Ok(ReconcileOutcome::NoDrift);
        }

        if classification.forces_manual_review() || strategy == ReconcileStrategy::ManualReview {
            let conflict_type = match classification {
                ThreeWayClassification::DualModification => ConflictType::DualModification,
                ThreeWayClassification::DeleteModifyConflict => ConflictType::DeleteModifyConflict,
                ThreeWayClassification::UniquenessViolation => ConflictType::UniquenessViolation,
                _ => ConflictType::PolicyReview,
            };
            let mut entry = ConflictLogEntry::new(resource_id, resource_type, conflict_type, "MANUAL_REVIEW", now);
            entry = entry.with_changes(upstream.cloned(), provider.cloned());
            let conflict_id = entry.conflict_id.clone();
            conflict_log.push(entry);
            return Ok(ReconcileOutcome::Quarantined { conflict_id });
        }

        if strategy == ReconcileStrategy::Ignore {
            return Ok(ReconcileOutcome::Ignored);
        }

        debug_assert_eq!(strategy, ReconcileStrategy::AutoApply);
        self.apply_auto(
            resource_type,
            resource_id,
            last_known,
            upstream,
            provider,
            direction,
            classification,
            upstream_adapter,
            provider_adapter,
            conflict_log,
            now,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn apply_auto(
        &self,
        resource_type: &str,
        resource_id: &str,
        last_known: Option<&Value>,
        upstream: Option<&Value>,
        provider: Option<&Value>,
        direction: Direction,
        classification: ThreeWayClassification,
        upstream_adapter: &dyn Adapter,
        provider_adapter: &dyn Adapter,
        conflict_log: &mut Vec<ConflictLogEntry>,
        now: DateTime<Utc>,
    ) -> ReconcileResult<ReconcileOutcome> {
        let (source, target, source_value) = match direction {
            Direction::UpstreamToProvider => (upstream_adapter, provider_adapter, upstream),
            Direction::ProviderToUpstream => (provider_adapter, upstream_adapter, provider),
            Direction::Bidirectional => match classification {
                ThreeWayClassification::OneSided(ChangedSide::Upstream) => {
                    (upstream_adapter, provider_adapter, upstream)
                }
                _ => (provider_adapter, upstream_adapter, provider),
            },
        };
        let _ = source;

        let result = push_to_target(resource_type, resource_id, last_known, source_value, target).await;

        match result {
            Ok(()) => Ok(ReconcileOutcome::Applied),
            Err(err) if err.scim_error_kind == ScimErrorKind::Uniqueness => {
                let mut entry = ConflictLogEntry::new(
                    resource_id,
                    resource_type,
                    ConflictType::UniquenessViolation,
                    "MANUAL_REVIEW",
                    now,
                );
                entry = entry.with_changes(upstream.cloned(), provider.cloned());
                let conflict_id = entry.conflict_id.clone();
                conflict_log.push(entry);
                Ok(ReconcileOutcome::Quarantined { conflict_id })
            }
            Err(err) => Err(ReconcileError::Adapter(err)),
        }
    }
}

/// Write `source_value` to `target`, inferring create/update/delete from
/// whether the resource existed at `last_known` and whether the source
/// still has a value (§4.6 AUTO_APPLY).
async fn push_to_target(
    resource_type: &str,
    resource_id: &str,
    last_known: Option<&Value>,
    source_value: Option<&Value>,
    target: &dyn Adapter,
) -> Result<(), AdapterError> {
    let is_group = resource_type.eq_ignore_ascii_case("Group");

    match (last_known, source_value) {
        (_, None) => {
            // Deleted at the source: delete at the target, tolerating an
            // already-absent target (idempotent at the SCIM layer, §8).
            let result = if is_group {
                target.delete_group(resource_id).await
            } else {
                target.delete_user(resource_id).await
            };
            match result {
                Ok(()) => Ok(()),
                Err(e) if e.scim_error_kind == ScimErrorKind::ResourceNotFound => Ok(()),
                Err(e) => Err(e),
            }
        }
        (None, Some(value)) => {
            if is_group {
                target.create_group(value.clone()).await.map(|_| ())
            } else {
                target.create_user(value.clone()).await.map(|_| ())
            }
        }
        (Some(_), Some(value)) => {
            if is_group {
                target.update_group(resource_id, value.clone()).await.map(|_| ())
            } else {
                target.update_user(resource_id, value.clone()).await.map(|_| ())
            }
        }
    }
}
