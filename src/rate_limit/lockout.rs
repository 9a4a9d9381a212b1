//! Auth-failure lockout tracker (§4.2).
//!
//! Keyed as `actor:<tenantId>:<actorId>` if `actorId` is present, else
//! `ip:<tenantId>:<ip>` if `ip` is present, else `tenant:<tenantId>`. On
//! each recorded failure, failures older than `authFailureWindow` are
//! pruned, then `now` is appended; if `count ≥ maxAuthFailures`,
//! `lockUntil = now + lockoutDuration`. An expired lockout clears both
//! `failures` and `lockUntil` on next access; a successful authentication
//! clears the key outright.

use chrono::{DateTime, Duration as ChronoDuration, Utc};

/// `{failures: timestamps within window, lockUntil?}` (§3). Invariant:
/// `lockUntil == None ∨ lockUntil > now`.
#[derive(Debug, Clone, Default)]
pub struct AuthFailureTrackerState {
    failures: Vec<DateTime<Utc>>,
    lock_until: Option<DateTime<Utc>>,
}

/// `{isLockedOut, failedAttempts, maxAttempts, lockoutEndsAt?,
/// retryAfterSeconds?}` (§4.2).
#[derive(Debug, Clone, PartialEq)]
pub struct LockoutStatus {
    pub is_locked_out: bool,
    pub failed_attempts: u32,
    pub max_attempts: u32,
    pub lockout_ends_at: Option<DateTime<Utc>>,
    pub retry_after_seconds: Option<u64>,
}

impl AuthFailureTrackerState {
    fn prune(&mut self, now: DateTime<Utc>, window: ChronoDuration) {
        let cutoff = now - window;
        self.failures.retain(|ts| *ts >= cutoff);
        if let Some(lock_until) = self.lock_until {
            if lock_until <= now {
                self.lock_until = None;
                self.failures.clear();
            }
        }
    }

    /// Record a failure at `now`, returning the resulting lockout status.
    pub fn record_failure(
        &mut self,
        now: DateTime<Utc>,
        window: ChronoDuration,
        max_attempts: u32,
        lockout_duration: ChronoDuration,
    ) -> LockoutStatus {
        self.prune(now, window);
        self.failures.push(now);
        if self.failures.len() as u32 >= max_attempts {
            self.lock_until = Some(now + lockout_duration);
        }
        self.status(now, max_attempts)
    }

    /// Check the current status without recording a new failure.
    pub fn check(&mut self, now: DateTime<Utc>, window: ChronoDuration, max_attempts: u32) -> LockoutStatus {
        self.prune(now, window);
        self.status(now, max_attempts)
    }

    /// Clear on a successful authentication event.
    pub fn clear(&mut self) {
        self.failures.clear();
        self.lock_until = None;
    }

    fn status(&self, now: DateTime<Utc>, max_attempts: u32) -> LockoutStatus {
        let is_locked_out = self.lock_until.is_some_and(|l| l > now);
        let retry_after_seconds = self
            .lock_until
            .filter(|l| *l > now)
            .map(|l| (l - now).num_seconds().max(0) as u64);
        LockoutStatus {
            is_locked_out,
            failed_attempts: self.failures.len() as u32,
            max_attempts,
            lockout_ends_at: self.lock_until,
            retry_after_seconds,
        }
    }
}

/// Derive the lockout key per the fallback chain in §4.2.
pub fn lockout_key(tenant_id: &str, actor_id: Option<&str>, ip: Option<&str>) -> String {
    if let Some(actor_id) = actor_id {
        format!("actor:{tenant_id}:{actor_id}")
    } else if let Some(ip) = ip {
        format!("ip:{tenant_id}:{ip}")
    } else {
        format!("tenant:{tenant_id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
    }

    #[test]
    fn test_key_fallback_chain() {
        assert_eq!(lockout_key("t1", Some("a1"), Some("1.2.3.4")), "actor:t1:a1");
        assert_eq!(lockout_key("t1", None, Some("1.2.3.4")), "ip:t1:1.2.3.4");
        assert_eq!(lockout_key("t1", None, None), "tenant:t1");
    }

    #[test]
    fn test_spec_scenario_five_failures_lock_fifteen_minutes() {
        let window = ChronoDuration::minutes(5);
        let lockout_duration = ChronoDuration::minutes(15);
        let mut tracker = AuthFailureTrackerState::default();

        let mut status = tracker.record_failure(t(0), window, 5, lockout_duration);
        assert!(!status.is_locked_out);
        for i in 1..5 {
            status = tracker.record_failure(t(i * 10), window, 5, lockout_duration);
        }
        assert!(status.is_locked_out);
        assert_eq!(status.failed_attempts, 5);
        let retry = status.retry_after_seconds.unwrap();
        assert!((retry as i64 - 900).abs() <= 40, "retry_after ~900s, got {retry}");
    }

    #[test]
    fn test_lockout_clears_after_expiry() {
        let window = ChronoDuration::minutes(5);
        let lockout_duration = ChronoDuration::minutes(15);
        let mut tracker = AuthFailureTrackerState::default();
        for i in 0..5 {
            tracker.record_failure(t(i * 10), window, 5, lockout_duration);
        }
        let sixteen_minutes_later = t(16 * 60 + 40);
        let status = tracker.check(sixteen_minutes_later, window, 5);
        assert!(!status.is_locked_out);
        assert_eq!(status.failed_attempts, 0);
    }

    #[test]
    fn test_successful_auth_clears_key() {
        let window = ChronoDuration::minutes(5);
        let lockout_duration = ChronoDuration::minutes(15);
        let mut tracker = AuthFailureTrackerState::default();
        tracker.record_failure(t(0), window, 5, lockout_duration);
        tracker.clear();
        let status = tracker.check(t(1), window, 5);
        assert_eq!(status.failed_attempts, 0);
    }

    #[test]
    fn test_failures_outside_window_are_pruned() {
        let window = ChronoDuration::minutes(5);
        let lockout_duration = ChronoDuration::minutes(15);
        let mut tracker = AuthFailureTrackerState::default();
        tracker.record_failure(t(0), window, 5, lockout_duration);
        let status = tracker.check(t(6 * 60), window, 5);
        assert_eq!(status.failed_attempts, 0);
    }
}
