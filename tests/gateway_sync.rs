//! End-to-end integration tests exercising the public API surface
//! (adapter registry, rate limiter, transformation engine, and the
//! polling service driving drift detection + reconciliation) the way a
//! gateway host would wire them together.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use scim_gateway_core::adapter::mock::MockAdapter;
use scim_gateway_core::rate_limit::RateLimitConfig;
use scim_gateway_core::reconcile::{Direction, ReconcileStrategy, SyncSettings};
use scim_gateway_core::transform::{ConflictResolution, RuleType, TransformationRule};
use scim_gateway_core::{AdapterRegistry, PollingService, RateLimiter, TransformationEngine, TickOutcome};
use scim_gateway_core::poll::CancellationToken;

#[tokio::test]
async fn registry_enforces_tenant_acl_and_disable() {
    let registry = AdapterRegistry::new();
    let adapter = Arc::new(MockAdapter::new("workday-prod", "Workday"));
    registry.register(adapter.clone()).await.unwrap();

    let err = registry
        .get_for_tenant("tenant-a", "workday-prod")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        scim_gateway_core::RegistryError::TenantNotAuthorized { .. }
    ));

    registry.grant_tenant_access("tenant-a", "workday-prod").await;
    let found = registry.get_for_tenant("tenant-a", "workday-prod").await.unwrap();
    assert_eq!(found.adapter_id(), "workday-prod");

    registry.disable("workday-prod").await;
    let err = registry
        .get_for_tenant("tenant-a", "workday-prod")
        .await
        .unwrap_err();
    assert!(matches!(err, scim_gateway_core::RegistryError::AdapterDisabled { .. }));
}

#[tokio::test]
async fn rate_limiter_admits_until_bucket_exhausted() {
    let config = RateLimitConfig {
        bucket_capacity: 2.0,
        refill_rate_per_second: 0.0,
        ..RateLimitConfig::default()
    };
    let limiter = RateLimiter::new(config);

    assert!(limiter.check_admission("tenant-a", None).await.allowed);
    assert!(limiter.check_admission("tenant-a", None).await.allowed);
    assert!(!limiter.check_admission("tenant-a", None).await.allowed);
}

#[test]
fn transformation_engine_resolves_union_conflict() {
    let engine = TransformationEngine::new();
    let rules = vec![
        TransformationRule::new(
            "r1",
            "tenant-a",
            "provider-a",
            RuleType::Exact,
            "Engineering",
            "eng-full-access",
        )
        .with_priority(0)
        .with_conflict_resolution(ConflictResolution::Union),
        TransformationRule::new(
            "r2",
            "tenant-a",
            "provider-a",
            RuleType::Regex,
            "^Eng.*",
            "eng-readonly",
        )
        .with_priority(1)
        .with_conflict_resolution(ConflictResolution::Union),
    ];

    let outcome = engine
        .transform_group(&rules, "grp-1", "Engineering", &HashMap::new())
        .unwrap();

    assert_eq!(outcome.matches.len(), 2);
    assert_eq!(outcome.resolved.len(), 2);
    assert!(outcome.conflict.is_none());
}

#[tokio::test]
async fn polling_tick_detects_and_applies_upstream_drift() {
    let upstream = MockAdapter::new("upstream", "Upstream Directory");
    let provider = MockAdapter::new("provider", "Target Provider");

    let created = provider.create_user(json!({"userName": "alice"})).await.unwrap();
    let user_id = created.get_id().unwrap().to_string();
    upstream.create_user(json!({"id": user_id, "userName": "alice"})).await.unwrap();

    let settings = SyncSettings {
        direction: Direction::UpstreamToProvider,
        strategy: ReconcileStrategy::AutoApply,
        interval_minutes: 15,
    };

    let service = PollingService::new(3);
    let now = Utc::now();
    let first = service
        .tick("tenant-a", "provider", &upstream, &provider, &settings, &CancellationToken::never(), now)
        .await;
    assert_eq!(first, TickOutcome::Completed);

    upstream
        .update_user(&user_id, json!({"id": user_id, "userName": "alice", "active": false}))
        .await
        .unwrap();

    let second = service
        .tick(
            "tenant-a",
            "provider",
            &upstream,
            &provider,
            &settings,
            &CancellationToken::never(),
            now + chrono::Duration::minutes(16),
        )
        .await;
    assert_eq!(second, TickOutcome::Completed);

    let updated = provider.get_user(&user_id).await.unwrap().unwrap();
    assert_eq!(updated.get_attribute("active"), Some(&json!(false)));
}

#[tokio::test]
async fn dual_modification_forces_manual_review_and_leaves_provider_untouched() {
    let upstream = MockAdapter::new("upstream", "Upstream Directory");
    let provider = MockAdapter::new("provider", "Target Provider");

    let created = provider.create_group(json!({"displayName": "Sales"})).await.unwrap();
    let group_id = created.get_id().unwrap().to_string();
    upstream
        .create_group(json!({"id": group_id, "displayName": "Sales"}))
        .await
        .unwrap();

    let settings = SyncSettings {
        direction: Direction::UpstreamToProvider,
        strategy: ReconcileStrategy::AutoApply,
        interval_minutes: 0,
    };
    let service = PollingService::new(3);
    let now = Utc::now();
    service
        .tick("tenant-a", "provider", &upstream, &provider, &settings, &CancellationToken::never(), now)
        .await;

    // Both sides change the same group differently before the next tick.
    upstream
        .update_group(&group_id, json!({"id": group_id, "displayName": "Sales EMEA"}))
        .await
        .unwrap();
    provider
        .update_group(&group_id, json!({"id": group_id, "displayName": "Sales Global"}))
        .await
        .unwrap();

    let outcome = service
        .tick(
            "tenant-a",
            "provider",
            &upstream,
            &provider,
            &settings,
            &CancellationToken::never(),
            now + chrono::Duration::minutes(1),
        )
        .await;
    assert_eq!(outcome, TickOutcome::Completed);

    let state = service.sync_state("tenant-a", "provider").await.unwrap();
    assert_eq!(state.conflict_log.len(), 1);
    assert!(!state.conflict_log[0].resolved);

    let still_providers_value = provider.get_group(&group_id).await.unwrap().unwrap();
    assert_eq!(still_providers_value.get_display_name(), Some("Sales Global"));
}
