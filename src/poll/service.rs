//! Polling service (§4.7): one scheduled worker per `(tenant, provider)`,
//! with no overlapping ticks for a given key (§5).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};

use crate::adapter::traits::Adapter;
use crate::audit::{
    AlertCooldownTracker, AlertSink, AuditRecord, AuditSink, NullAlertSink, NullAuditSink,
    OperationsAlert, Outcome, Severity,
};
use crate::drift::{content_hash, detect_drift, DriftLogEntry, DriftType};
use crate::error::AdapterError;
use crate::reconcile::{Reconciler, ReconcileOutcome, SyncSettings};
use crate::resource::{PagedResult, QueryFilter, Resource};

use super::types::{CancellationToken, SyncState, SyncStateSnapshot, SyncStatus};

/// Outcome of a single `tick` call, reported back to the scheduler loop.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Another worker is already running this `(tenant, provider)`.
    SkippedInProgress,
    /// `now - lastSyncTimestamp < interval`.
    SkippedInterval,
    Completed,
    CompletedWithErrors,
    Failed(String),
    /// Cancelled mid-tick; status rolled back, snapshot not advanced.
    Cancelled,
}

type StateMap = HashMap<(String, String), Arc<Mutex<SyncState>>>;

/// Scheduled worker registry, keyed by `(tenantId, providerId)` (§4.7,
/// §5). Cheaply cloneable; the inner map is `tokio::sync::RwLock`-guarded
/// for concurrent-insert-safe access, each entry additionally guarded by
/// its own `Mutex` held for the whole tick (§5 Shared-resource policy).
#[derive(Clone)]
pub struct PollingService {
    states: Arc<RwLock<StateMap>>,
    reconciler: Reconciler,
    max_retries: u32,
    audit_sink: Arc<dyn AuditSink>,
    alert_sink: Arc<dyn AlertSink>,
    alert_cooldown: Arc<AlertCooldownTracker>,
}

impl PollingService {
    pub fn new(max_retries: u32) -> Self {
        Self::with_sinks(max_retries, Arc::new(NullAuditSink), Arc::new(NullAlertSink))
    }

    /// Construct a service that emits audit records and operations alerts
    /// (§7) through the given sinks instead of discarding them.
    pub fn with_sinks(
        max_retries: u32,
        audit_sink: Arc<dyn AuditSink>,
        alert_sink: Arc<dyn AlertSink>,
    ) -> Self {
        Self {
            states: Arc::new(RwLock::new(HashMap::new())),
            reconciler: Reconciler::new(),
            max_retries,
            audit_sink,
            alert_sink,
            alert_cooldown: Arc::new(AlertCooldownTracker::new()),
        }
    }

    /// Emit an audit record for one adapter operation (§7: "every
    /// operation ... emits an audit record").
    #[allow(clippy::too_many_arguments)]
    fn audit(
        &self,
        tenant_id: &str,
        provider_id: &str,
        operation_type: &str,
        resource_type: &str,
        resource_id: Option<&str>,
        adapter: &dyn Adapter,
        outcome: Outcome,
        duration: std::time::Duration,
        error: Option<&AdapterError>,
        now: DateTime<Utc>,
    ) {
        let mut record = AuditRecord::new(
            operation_type,
            resource_type,
            tenant_id,
            provider_id,
            "poller",
            adapter.adapter_id(),
            outcome,
            duration.as_millis() as u64,
            now,
        );
        if let Some(id) = resource_id {
            record = record.with_resource_id(id);
        }
        if let Some(err) = error {
            record = record.with_error(err.provider_error_code.clone(), err.to_string());
        }
        self.audit_sink.record(record);
    }

    /// Raise an operations alert for an adapter failure, suppressed by the
    /// cooldown tracker (§7: "emit an operations alert ... within a
    /// cooldown window").
    fn alert(&self, tenant_id: &str, provider_id: &str, err: &AdapterError, retry_count: u32, now: DateTime<Utc>) {
        let severity = if err.scim_error_kind.is_critical() {
            Severity::Critical
        } else {
            Severity::Warning
        };
        let alert = OperationsAlert {
            severity,
            tenant_id: tenant_id.to_string(),
            provider_id: provider_id.to_string(),
            error_kind: err.scim_error_kind,
            message: err.to_string(),
            retry_count,
            recommended_action: OperationsAlert::recommended_action_for(err.scim_error_kind).to_string(),
        };
        self.alert_cooldown.fire(self.alert_sink.as_ref(), alert, now);
    }

    async fn state_for(&self, tenant_id: &str, provider_id: &str) -> Arc<Mutex<SyncState>> {
        let key = (tenant_id.to_string(), provider_id.to_string());
        if let Some(existing) = self.states.read().await.get(&key) {
            return existing.clone();
        }
        let mut states = self.states.write().await;
        states.entry(key).or_insert_with(|| Arc::new(Mutex::new(SyncState::new()))).clone()
    }

    /// A read-only snapshot of the sync state for `(tenant_id,
    /// provider_id)`, or `None` if no tick has ever run for that key.
    pub async fn sync_state(&self, tenant_id: &str, provider_id: &str) -> Option<SyncStateSnapshot> {
        let key = (tenant_id.to_string(), provider_id.to_string());
        let handle = self.states.read().await.get(&key)?.clone();
        Some(handle.lock().await.snapshot())
    }

    /// Resolve `action` (§4.6 Resolution actions) against an unresolved
    /// conflict, executing it (except `IGNORE`) and marking it resolved.
    /// Dispatches to `update_user`/`update_group` on the conflict's own
    /// `resource_type`, and surfaces the adapter's outcome to the caller
    /// instead of discarding it (§4.6 "the action is executed").
    pub async fn resolve_conflict(
        &self,
        tenant_id: &str,
        provider_id: &str,
        conflict_id: &str,
        action: crate::transform::ResolutionAction,
        resolved_by: &str,
        provider_adapter: &dyn Adapter,
        now: DateTime<Utc>,
    ) -> Option<crate::error::AdapterResult<()>> {
        let handle = self.state_for(tenant_id, provider_id).await;
        let mut state = handle.lock().await;
        let idx = state.conflict_log.iter().position(|c| c.conflict_id == conflict_id && !c.resolved)?;

        let resource_id = state.conflict_log[idx].resource_id.clone();
        let is_group = state.conflict_log[idx].resource_type.eq_ignore_ascii_case("Group");

        let push = |value: Value| {
            let provider_adapter = provider_adapter;
            let resource_id = resource_id.clone();
            async move {
                if is_group {
                    provider_adapter.update_group(&resource_id, value).await.map(|_| ())
                } else {
                    provider_adapter.update_user(&resource_id, value).await.map(|_| ())
                }
            }
        };

        let result = match &action {
            crate::transform::ResolutionAction::ApplyUpstream => {
                match state.conflict_log[idx].upstream_change.clone() {
                    Some(value) => push(value).await,
                    None => Ok(()),
                }
            }
            crate::transform::ResolutionAction::ApplyProvider => Ok(()),
            crate::transform::ResolutionAction::Custom(payload) => {
                match serde_json::from_str::<Value>(payload) {
                    Ok(value) => push(value).await,
                    Err(_) => Ok(()),
                }
            }
            crate::transform::ResolutionAction::Ignore => Ok(()),
        };

        if let Err(err) = &result {
            log::error!("resolve_conflict {conflict_id} failed to apply to provider: {err}");
            self.audit(
                tenant_id,
                provider_id,
                "resolveConflict",
                &state.conflict_log[idx].resource_type.clone(),
                Some(&resource_id),
                provider_adapter,
                Outcome::Failure,
                std::time::Duration::ZERO,
                Some(err),
                now,
            );
            self.alert(tenant_id, provider_id, err, 0, now);
        }

        state.conflict_log[idx].resolve(action, resolved_by, now);
        Some(result)
    }

    /// Page through `list_users`, emitting an audit record for every
    /// network round-trip (§7) and an operations alert if the adapter
    /// ultimately fails.
    async fn fetch_all_users(
        &self,
        tenant_id: &str,
        provider_id: &str,
        adapter: &dyn Adapter,
        max_page_size: usize,
        now: DateTime<Utc>,
    ) -> crate::error::AdapterResult<Vec<Resource>> {
        let mut out = Vec::new();
        let mut start_index = 1usize;
        loop {
            let filter = QueryFilter::new().with_start_index(start_index).with_count(max_page_size);
            let started = Instant::now();
            let outcome = super::retry::with_retry_counted(self.max_retries, || adapter.list_users(&filter)).await;
            let elapsed = started.elapsed();
            let page: PagedResult<Resource> = match outcome {
                Ok((page, _attempts)) => {
                    self.audit(
                        tenant_id, provider_id, "listUsers", "User", None, adapter, Outcome::Success, elapsed, None,
                        now,
                    );
                    page
                }
                Err(err) => {
                    self.audit(
                        tenant_id,
                        provider_id,
                        "listUsers",
                        "User",
                        None,
                        adapter,
                        Outcome::Failure,
                        elapsed,
                        Some(&err),
                        now,
                    );
                    let retry_count = if err.is_retryable { self.max_retries } else { 0 };
                    self.alert(tenant_id, provider_id, &err, retry_count, now);
                    return Err(err);
                }
            };
            let got = page.resources.len();
            out.extend(page.resources);
            if !page.has_more() || got == 0 {
                break;
            }
            start_index += got;
        }
        Ok(out)
    }

    /// Page through `list_groups`; see [`Self::fetch_all_users`].
    async fn fetch_all_groups(
        &self,
        tenant_id: &str,
        provider_id: &str,
        adapter: &dyn Adapter,
        max_page_size: usize,
        now: DateTime<Utc>,
    ) -> crate::error::AdapterResult<Vec<Resource>> {
        let mut out = Vec::new();
        let mut start_index = 1usize;
        loop {
            let filter = QueryFilter::new().with_start_index(start_index).with_count(max_page_size);
            let started = Instant::now();
            let outcome = super::retry::with_retry_counted(self.max_retries, || adapter.list_groups(&filter)).await;
            let elapsed = started.elapsed();
            let page: PagedResult<Resource> = match outcome {
                Ok((page, _attempts)) => {
                    self.audit(
                        tenant_id, provider_id, "listGroups", "Group", None, adapter, Outcome::Success, elapsed,
                        None, now,
                    );
                    page
                }
                Err(err) => {
                    self.audit(
                        tenant_id,
                        provider_id,
                        "listGroups",
                        "Group",
                        None,
                        adapter,
                        Outcome::Failure,
                        elapsed,
                        Some(&err),
                        now,
                    );
                    let retry_count = if err.is_retryable { self.max_retries } else { 0 };
                    self.alert(tenant_id, provider_id, &err, retry_count, now);
                    return Err(err);
                }
            };
            let got = page.resources.len();
            out.extend(page.resources);
            if !page.has_more() || got == 0 {
                break;
            }
            start_index += got;
        }
        Ok(out)
    }

    fn snapshot_of(resources: &[Resource]) -> HashMap<String, Value> {
        resources
            .iter()
            .filter_map(|r| r.get_id().map(|id| (id.to_string(), r.normalized())))
            .collect()
    }

    /// Run one tick for `(tenant_id, provider_id)` (§4.7 tick algorithm).
    #[allow(clippy::too_many_arguments)]
    pub async fn tick(
        &self,
        tenant_id: &str,
        provider_id: &str,
        upstream_adapter: &dyn Adapter,
        provider_adapter: &dyn Adapter,
        settings: &SyncSettings,
        cancellation: &CancellationToken,
        now: DateTime<Utc>,
    ) -> TickOutcome {
        let handle = self.state_for(tenant_id, provider_id).await;
        let mut state = handle.lock().await;

        if state.status == SyncStatus::InProgress {
            return TickOutcome::SkippedInProgress;
        }
        if let Some(last) = state.last_sync_timestamp {
            if now - last < ChronoDuration::minutes(settings.interval_minutes) {
                return TickOutcome::SkippedInterval;
            }
        }

        state.status = SyncStatus::InProgress;
        let previous_user_count = state.user_count;
        log::info!("poll tick start tenant={tenant_id} provider={provider_id}");

        let provider_max_page = provider_adapter.capabilities().max_page_size;
        let provider_users = self.fetch_all_users(tenant_id, provider_id, provider_adapter, provider_max_page, now).await;
        let provider_groups = match &provider_users {
            Ok(_) => self.fetch_all_groups(tenant_id, provider_id, provider_adapter, provider_max_page, now).await,
            Err(_) => Ok(Vec::new()),
        };

        let (provider_users, provider_groups) = match (provider_users, provider_groups) {
            (Ok(u), Ok(g)) => (u, g),
            (Err(e), _) | (_, Err(e)) => {
                state.error_log.push(e.to_string());
                state.status = SyncStatus::Failed;
                log::error!("poll tick failed tenant={tenant_id} provider={provider_id}: {e}");
                return TickOutcome::Failed(e.to_string());
            }
        };

        if cancellation.is_cancelled() {
            state.status = SyncStatus::Idle;
            return TickOutcome::Cancelled;
        }

        let upstream_max_page = upstream_adapter.capabilities().max_page_size;
        let upstream_users = self.fetch_all_users(tenant_id, provider_id, upstream_adapter, upstream_max_page, now).await;
        let upstream_groups = match &upstream_users {
            Ok(_) => self.fetch_all_groups(tenant_id, provider_id, upstream_adapter, upstream_max_page, now).await,
            Err(_) => Ok(Vec::new()),
        };
        let (upstream_users, upstream_groups) = match (upstream_users, upstream_groups) {
            (Ok(u), Ok(g)) => (u, g),
            (Err(e), _) | (_, Err(e)) => {
                state.error_log.push(e.to_string());
                state.status = SyncStatus::Failed;
                log::error!("poll tick failed tenant={tenant_id} provider={provider_id}: {e}");
                return TickOutcome::Failed(e.to_string());
            }
        };

        // Guard against a misbehaving provider reporting a mass deletion
        // (§4.7 step 4): skip applying deletions this tick and emit a
        // warning drift instead.
        let skip_deletions = provider_users.is_empty() && previous_user_count > 0;
        if skip_deletions {
            let entry = DriftLogEntry::new(
                "*",
                "User",
                DriftType::Modified,
                None,
                Some(serde_json::json!({ "warning": "SuspiciousEmptyResponse" })),
                now,
            );
            state.drift_log.push(entry);
            log::warn!(
                "suspicious empty response from provider={provider_id}, skipping deletions this tick"
            );
        }

        let current_provider_users = Self::snapshot_of(&provider_users);
        let current_provider_groups = Self::snapshot_of(&provider_groups);
        let current_upstream_users = Self::snapshot_of(&upstream_users);
        let current_upstream_groups = Self::snapshot_of(&upstream_groups);

        let previous_provider_users = state.last_known_state.get("User").cloned().unwrap_or_default();
        let previous_provider_groups = state.last_known_state.get("Group").cloned().unwrap_or_default();

        // Union of provider-side drift (last known vs. current provider) and
        // upstream-side drift (last known vs. current upstream): a resource
        // changed only on one side must still surface here, or the
        // reconcile loop below never sees it (§4.7 step 5).
        let mut drift_by_key: HashMap<(String, String), DriftLogEntry> = HashMap::new();
        for entry in detect_drift(&previous_provider_users, &current_provider_users, "User", now)
            .into_iter()
            .chain(detect_drift(&previous_provider_groups, &current_provider_groups, "Group", now))
            .chain(detect_drift(&previous_provider_users, &current_upstream_users, "User", now))
            .chain(detect_drift(&previous_provider_groups, &current_upstream_groups, "Group", now))
        {
            drift_by_key
                .entry((entry.resource_type.clone(), entry.resource_id.clone()))
                .or_insert(entry);
        }
        let mut drift: Vec<DriftLogEntry> = drift_by_key.into_values().collect();

        if skip_deletions {
            drift.retain(|d| d.drift_type != DriftType::Deleted);
        }

        let mut had_errors = false;
        for entry in &mut drift {
            if entry.drift_type != DriftType::Modified {
                continue;
            }
            let (last_known_by_type, current_upstream_by_type) = if entry.resource_type.eq_ignore_ascii_case("Group")
            {
                (&previous_provider_groups, &current_upstream_groups)
            } else {
                (&previous_provider_users, &current_upstream_users)
            };
            let last_known = last_known_by_type.get(&entry.resource_id);
            let upstream = current_upstream_by_type.get(&entry.resource_id);
            if last_known.is_some() && upstream.is_some() && !eq(last_known, upstream) {
                *entry = entry.clone().into_attribute_mismatch();
            }
        }

        let blocked = state.unresolved_conflict_resource_ids();

        for entry in &mut drift {
            let (last_known_by_type, upstream_by_type, provider_by_type) = if entry.resource_type.eq_ignore_ascii_case("Group") {
                (&previous_provider_groups, &current_upstream_groups, &current_provider_groups)
            } else {
                (&previous_provider_users, &current_upstream_users, &current_provider_users)
            };
            let last_known = last_known_by_type.get(&entry.resource_id);
            let upstream = upstream_by_type.get(&entry.resource_id);
            let provider = provider_by_type.get(&entry.resource_id);

            let started = Instant::now();
            let outcome = self
                .reconciler
                .reconcile_resource(
                    &entry.resource_type,
                    &entry.resource_id,
                    last_known,
                    upstream,
                    provider,
                    settings.direction,
                    settings.strategy,
                    upstream_adapter,
                    provider_adapter,
                    &mut state.conflict_log,
                    &blocked,
                    now,
                )
                .await;
            let elapsed = started.elapsed();
            let apply_adapter = match settings.direction {
                crate::reconcile::Direction::ProviderToUpstream => upstream_adapter,
                crate::reconcile::Direction::UpstreamToProvider | crate::reconcile::Direction::Bidirectional => {
                    provider_adapter
                }
            };

            match outcome {
                Ok(ReconcileOutcome::Applied) => {
                    entry.mark_reconciled("AUTO_APPLY", now);
                    self.audit(
                        tenant_id,
                        provider_id,
                        "reconcile",
                        &entry.resource_type,
                        Some(&entry.resource_id),
                        apply_adapter,
                        Outcome::Success,
                        elapsed,
                        None,
                        now,
                    );
                }
                Ok(ReconcileOutcome::NoDrift) | Ok(ReconcileOutcome::Ignored) => {}
                Ok(ReconcileOutcome::Quarantined { .. }) | Ok(ReconcileOutcome::BlockedByExistingConflict { .. }) => {}
                Err(e) => {
                    had_errors = true;
                    state.error_log.push(e.to_string());
                    log::error!("reconcile failed for {} {}: {e}", entry.resource_type, entry.resource_id);
                    if let crate::error::ReconcileError::Adapter(adapter_err) = &e {
                        self.audit(
                            tenant_id,
                            provider_id,
                            "reconcile",
                            &entry.resource_type,
                            Some(&entry.resource_id),
                            apply_adapter,
                            Outcome::Failure,
                            elapsed,
                            Some(adapter_err),
                            now,
                        );
                        let retry_count = if adapter_err.is_retryable { self.max_retries } else { 0 };
                        self.alert(tenant_id, provider_id, adapter_err, retry_count, now);
                    } else {
                        self.audit(
                            tenant_id,
                            provider_id,
                            "reconcile",
                            &entry.resource_type,
                            Some(&entry.resource_id),
                            apply_adapter,
                            Outcome::Failure,
                            elapsed,
                            None,
                            now,
                        );
                    }
                }
            }
        }

        state.drift_log.extend(drift);

        let mut last_known_state = HashMap::new();
        last_known_state.insert("User".to_string(), current_provider_users);
        last_known_state.insert("Group".to_string(), current_provider_groups);
        let snapshot_value = serde_json::to_value(&last_known_state).unwrap_or(Value::Null);

        state.last_known_state = last_known_state;
        state.user_count = provider_users.len();
        state.group_count = provider_groups.len();
        state.snapshot_checksum = Some(content_hash(&snapshot_value));
        state.snapshot_timestamp = Some(now);
        state.last_sync_timestamp = Some(now);

        state.status = if had_errors { SyncStatus::CompletedWithErrors } else { SyncStatus::Completed };
        log::info!(
            "poll tick {:?} tenant={tenant_id} provider={provider_id} users={} groups={}",
            state.status,
            state.user_count,
            state.group_count
        );

        if had_errors {
            TickOutcome::CompletedWithErrors
        } else {
            TickOutcome::Completed
        }
    }
}

fn eq(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => content_hash(x) == content_hash(y),
        _ => false,
    }
}
