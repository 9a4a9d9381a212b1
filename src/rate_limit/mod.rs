//! Rate limiter & auth-failure lockout tracker (§4.2).
//!
//! Two independent cross-cutting services share this module: a
//! continuous-refill token bucket keyed per tenant (and optionally per
//! actor) for request admission, and a sliding-window failure tracker
//! with exponential-feeling (fixed-duration, repeatedly applied) lockout
//! for authentication attempts. Both key→state maps are process-wide and
//! mutated under a per-key lock (§9 Global State); the maps themselves
//! use `tokio::sync::RwLock` for concurrent-insert-safe access.

pub mod admission;
pub mod lockout;
pub mod token_bucket;

pub use admission::{AdmissionResult, DistributedRateStore};
pub use lockout::{lockout_key, AuthFailureTrackerState, LockoutStatus};
pub use token_bucket::TokenBucketState;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::sync::{Mutex, RwLock};

/// Per-tenant override of the global rate-limit defaults (§6 Configuration
/// surface `perTenantOverrides`).
#[derive(Debug, Clone, Default)]
pub struct TenantRateLimitOverride {
    pub bucket_capacity: Option<f64>,
    pub refill_rate_per_second: Option<f64>,
    pub max_requests_per_actor_per_minute: Option<f64>,
}

/// `{bucketCapacity, refillRatePerSecond, maxAuthFailures, lockoutDuration,
/// authFailureWindow, enablePerActorLimits, maxRequestsPerActorPerMinute,
/// perTenantOverrides}` (§6).
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub bucket_capacity: f64,
    pub refill_rate_per_second: f64,
    pub max_auth_failures: u32,
    pub lockout_duration: ChronoDuration,
    pub auth_failure_window: ChronoDuration,
    pub enable_per_actor_limits: bool,
    pub max_requests_per_actor_per_minute: f64,
    pub per_tenant_overrides: HashMap<String, TenantRateLimitOverride>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            bucket_capacity: 100.0,
            refill_rate_per_second: 10.0,
            max_auth_failures: 5,
            lockout_duration: ChronoDuration::minutes(15),
            auth_failure_window: ChronoDuration::minutes(5),
            enable_per_actor_limits: true,
            max_requests_per_actor_per_minute: 60.0,
            per_tenant_overrides: HashMap::new(),
        }
    }
}

impl RateLimitConfig {
    fn tenant_bucket_params(&self, tenant_id: &str) -> (f64, f64) {
        let over = self.per_tenant_overrides.get(tenant_id);
        let capacity = over.and_then(|o| o.bucket_capacity).unwrap_or(self.bucket_capacity);
        let rate = over
            .and_then(|o| o.refill_rate_per_second)
            .unwrap_or(self.refill_rate_per_second);
        (capacity, rate)
    }

    fn actor_bucket_params(&self, tenant_id: &str) -> (f64, f64) {
        let over = self.per_tenant_overrides.get(tenant_id);
        let per_minute = over
            .and_then(|o| o.max_requests_per_actor_per_minute)
            .unwrap_or(self.max_requests_per_actor_per_minute);
        (per_minute, per_minute / 60.0)
    }
}

/// The in-memory, single-node rate limiter and lockout tracker (§4.2).
/// Thread-safe and cheaply cloneable (internally `Arc`-backed).
#[derive(Clone)]
pub struct RateLimiter {
    config: Arc<RateLimitConfig>,
    buckets: Arc<RwLock<HashMap<String, Arc<Mutex<TokenBucketState>>>>>,
    lockouts: Arc<RwLock<HashMap<String, Arc<Mutex<AuthFailureTrackerState>>>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config: Arc::new(config),
            buckets: Arc::new(RwLock::new(HashMap::new())),
            lockouts: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn bucket_for(&self, key: &str, capacity: f64, rate: f64) -> Arc<Mutex<TokenBucketState>> {
        if let Some(existing) = self.buckets.read().await.get(key) {
            return existing.clone();
        }
        let mut buckets = self.buckets.write().await;
        buckets
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(TokenBucketState::new(capacity, rate))))
            .clone()
    }

    async fn lockout_for(&self, key: &str) -> Arc<Mutex<AuthFailureTrackerState>> {
        if let Some(existing) = self.lockouts.read().await.get(key) {
            return existing.clone();
        }
        let mut lockouts = self.lockouts.write().await;
        lockouts.entry(key.to_string()).or_default().clone()
    }

    fn admission_from_outcome(
        remaining: f64,
        rate: f64,
        capacity: f64,
        allowed: bool,
        reason: Option<String>,
    ) -> AdmissionResult {
        let now = Utc::now();
        let seconds_until_one_token = if remaining > 0.0 { 0.0 } else { (1.0 - remaining) / rate };
        let reset_at = now
            + ChronoDuration::milliseconds((seconds_until_one_token * 1000.0).round() as i64);
        let retry_after_seconds = seconds_until_one_token.ceil().max(0.0) as u64;
        AdmissionResult {
            allowed,
            remaining_tokens: remaining.floor().max(0.0) as u64,
            limit: capacity.floor().max(0.0) as u64,
            reset_at,
            retry_after_seconds,
            reason,
        }
    }

    /// Check (and atomically consume) admission for a request. Checks the
    /// coarse tenant bucket first; a tenant rejection takes precedence
    /// over the per-actor check and short-circuits it (§4.2).
    pub async fn check_admission(&self, tenant_id: &str, actor_id: Option<&str>) -> AdmissionResult {
        let tenant_key = format!("tenant:{tenant_id}");
        let (tenant_capacity, tenant_rate) = self.config.tenant_bucket_params(tenant_id);
        let tenant_bucket = self.bucket_for(&tenant_key, tenant_capacity, tenant_rate).await;
        let tenant_outcome = {
            let mut bucket = tenant_bucket.lock().await;
            bucket.try_consume(1.0, Instant::now())
        };
        if !tenant_outcome.allowed {
            return Self::admission_from_outcome(
                tenant_outcome.remaining,
                tenant_rate,
                tenant_capacity,
                false,
                Some("tenant rate limit exceeded".to_string()),
            );
        }

        if self.config.enable_per_actor_limits {
            if let Some(actor_id) = actor_id {
                let actor_key = format!("tenant:{tenant_id}:actor:{actor_id}");
                let (actor_capacity, actor_rate) = self.config.actor_bucket_params(tenant_id);
                let actor_bucket = self.bucket_for(&actor_key, actor_capacity, actor_rate).await;
                let actor_outcome = {
                    let mut bucket = actor_bucket.lock().await;
                    bucket.try_consume(1.0, Instant::now())
                };
                if !actor_outcome.allowed {
                    return Self::admission_from_outcome(
                        actor_outcome.remaining,
                        actor_rate,
                        actor_capacity,
                        false,
                        Some("actor rate limit exceeded".to_string()),
                    );
                }
                return Self::admission_from_outcome(
                    actor_outcome.remaining,
                    actor_rate,
                    actor_capacity,
                    true,
                    None,
                );
            }
        }

        Self::admission_from_outcome(tenant_outcome.remaining, tenant_rate, tenant_capacity, true, None)
    }

    pub async fn record_auth_failure(
        &self,
        tenant_id: &str,
        actor_id: Option<&str>,
        ip: Option<&str>,
    ) -> LockoutStatus {
        let key = lockout_key(tenant_id, actor_id, ip);
        let tracker = self.lockout_for(&key).await;
        let mut tracker = tracker.lock().await;
        tracker.record_failure(
            Utc::now(),
            self.config.auth_failure_window,
            self.config.max_auth_failures,
            self.config.lockout_duration,
        )
    }

    pub async fn check_lockout(&self, tenant_id: &str, actor_id: Option<&str>, ip: Option<&str>) -> LockoutStatus {
        let key = lockout_key(tenant_id, actor_id, ip);
        let tracker = self.lockout_for(&key).await;
        let mut tracker = tracker.lock().await;
        tracker.check(Utc::now(), self.config.auth_failure_window, self.config.max_auth_failures)
    }

    /// Clear the lockout key on a successful authentication event (§4.2).
    pub async fn clear_lockout(&self, tenant_id: &str, actor_id: Option<&str>, ip: Option<&str>) {
        let key = lockout_key(tenant_id, actor_id, ip);
        let tracker = self.lockout_for(&key).await;
        tracker.lock().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RateLimitConfig {
        RateLimitConfig {
            bucket_capacity: 10.0,
            refill_rate_per_second: 1.0,
            enable_per_actor_limits: true,
            max_requests_per_actor_per_minute: 600.0,
            ..RateLimitConfig::default()
        }
    }

    #[tokio::test]
    async fn test_tenant_admission_burst_then_reject() {
        let limiter = RateLimiter::new(config());
        for _ in 0..10 {
            let result = limiter.check_admission("tenant-a", None).await;
            assert!(result.allowed);
        }
        let eleventh = limiter.check_admission("tenant-a", None).await;
        assert!(!eleventh.allowed);
        assert!(eleventh.retry_after_seconds >= 1);
    }

    #[tokio::test]
    async fn test_tenant_rejection_takes_precedence_over_actor() {
        let limiter = RateLimiter::new(RateLimitConfig {
            bucket_capacity: 1.0,
            refill_rate_per_second: 0.001,
            ..config()
        });
        let first = limiter.check_admission("tenant-a", Some("actor-1")).await;
        assert!(first.allowed);
        let second = limiter.check_admission("tenant-a", Some("actor-1")).await;
        assert!(!second.allowed);
        assert_eq!(second.reason.as_deref(), Some("tenant rate limit exceeded"));
    }

    #[tokio::test]
    async fn test_different_tenants_have_independent_buckets() {
        let limiter = RateLimiter::new(config());
        for _ in 0..10 {
            assert!(limiter.check_admission("tenant-a", None).await.allowed);
        }
        assert!(limiter.check_admission("tenant-b", None).await.allowed);
    }

    #[tokio::test]
    async fn test_lockout_roundtrip_through_limiter() {
        let limiter = RateLimiter::new(RateLimitConfig {
            max_auth_failures: 2,
            auth_failure_window: ChronoDuration::minutes(5),
            lockout_duration: ChronoDuration::minutes(15),
            ..config()
        });
        limiter.record_auth_failure("tenant-a", Some("actor-1"), None).await;
        let status = limiter.record_auth_failure("tenant-a", Some("actor-1"), None).await;
        assert!(status.is_locked_out);

        limiter.clear_lockout("tenant-a", Some("actor-1"), None).await;
        let status = limiter.check_lockout("tenant-a", Some("actor-1"), None).await;
        assert!(!status.is_locked_out);
    }
}
