//! Operations alerting (§7): severity, recommended action, and
//! cooldown-suppressed duplicate alerts for the same `(tenant, provider,
//! errorKind)` within a 15-minute window. The alert transport itself
//! (PagerDuty, Slack, email) is external; `AlertSink` is the seam.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration as ChronoDuration, Utc};

use crate::error::ScimErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Critical,
}

/// `{severity, tenantId, providerId, errorKind, message, retryCount,
/// recommendedAction}` (§7).
#[derive(Debug, Clone)]
pub struct OperationsAlert {
    pub severity: Severity,
    pub tenant_id: String,
    pub provider_id: String,
    pub error_kind: ScimErrorKind,
    pub message: String,
    pub retry_count: u32,
    pub recommended_action: String,
}

impl OperationsAlert {
    pub fn recommended_action_for(kind: ScimErrorKind) -> &'static str {
        match kind {
            ScimErrorKind::Unauthorized => "refresh credentials in secret store",
            ScimErrorKind::Forbidden => "verify adapter service account permissions",
            ScimErrorKind::RateLimitExceeded => "reduce poll frequency or request a higher provider quota",
            ScimErrorKind::ServerUnavailable | ScimErrorKind::Timeout => "check provider status page",
            _ => "investigate error log for root cause",
        }
    }
}

pub trait AlertSink: Send + Sync {
    fn alert(&self, alert: OperationsAlert);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullAlertSink;

impl AlertSink for NullAlertSink {
    fn alert(&self, _alert: OperationsAlert) {}
}

#[derive(Default)]
pub struct VecAlertSink {
    alerts: Mutex<Vec<OperationsAlert>>,
}

impl VecAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<OperationsAlert> {
        self.alerts.lock().unwrap().iter().cloned().collect()
    }
}

impl AlertSink for VecAlertSink {
    fn alert(&self, alert: OperationsAlert) {
        self.alerts.lock().unwrap().push(alert);
    }
}

fn cooldown_window() -> ChronoDuration {
    ChronoDuration::minutes(15)
}

/// Suppresses repeat alerts for the same `(tenant, provider, errorKind)`
/// within the cooldown window (§7). Owned by the caller driving the
/// error-handling path (reconciler/polling service), not the sink itself,
/// so different deployments can share one sink across many suppressors
/// or vice versa.
#[derive(Default)]
pub struct AlertCooldownTracker {
    last_fired: Mutex<HashMap<(String, String, String), DateTime<Utc>>>,
}

impl AlertCooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire `alert` through `sink` unless an alert with the same
    /// `(tenant, provider, errorKind)` fired within the cooldown window.
    /// Returns whether the alert was actually sent.
    pub fn fire(&self, sink: &dyn AlertSink, alert: OperationsAlert, now: DateTime<Utc>) -> bool {
        let key = (
            alert.tenant_id.clone(),
            alert.provider_id.clone(),
            alert.error_kind.to_string(),
        );
        let mut last_fired = self.last_fired.lock().unwrap();
        if let Some(previous) = last_fired.get(&key) {
            if now - *previous < cooldown_window() {
                return false;
            }
        }
        last_fired.insert(key, now);
        drop(last_fired);
        sink.alert(alert);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(tenant: &str, provider: &str, kind: ScimErrorKind) -> OperationsAlert {
        OperationsAlert {
            severity: Severity::Critical,
            tenant_id: tenant.to_string(),
            provider_id: provider.to_string(),
            error_kind: kind,
            message: "auth failed".to_string(),
            retry_count: 0,
            recommended_action: OperationsAlert::recommended_action_for(kind).to_string(),
        }
    }

    #[test]
    fn second_alert_within_cooldown_is_suppressed() {
        let tracker = AlertCooldownTracker::new();
        let sink = VecAlertSink::new();
        let now = Utc::now();

        assert!(tracker.fire(&sink, alert("tenant-a", "provider-a", ScimErrorKind::Unauthorized), now));
        assert!(!tracker.fire(
            &sink,
            alert("tenant-a", "provider-a", ScimErrorKind::Unauthorized),
            now + ChronoDuration::minutes(5)
        ));
        assert_eq!(sink.alerts().len(), 1);
    }

    #[test]
    fn alert_fires_again_after_cooldown_elapses() {
        let tracker = AlertCooldownTracker::new();
        let sink = VecAlertSink::new();
        let now = Utc::now();

        tracker.fire(&sink, alert("tenant-a", "provider-a", ScimErrorKind::Unauthorized), now);
        let fired = tracker.fire(
            &sink,
            alert("tenant-a", "provider-a", ScimErrorKind::Unauthorized),
            now + ChronoDuration::minutes(16),
        );
        assert!(fired);
        assert_eq!(sink.alerts().len(), 2);
    }

    #[test]
    fn distinct_error_kinds_are_independent() {
        let tracker = AlertCooldownTracker::new();
        let sink = VecAlertSink::new();
        let now = Utc::now();

        tracker.fire(&sink, alert("tenant-a", "provider-a", ScimErrorKind::Unauthorized), now);
        tracker.fire(&sink, alert("tenant-a", "provider-a", ScimErrorKind::Forbidden), now);
        assert_eq!(sink.alerts().len(), 2);
    }
}
