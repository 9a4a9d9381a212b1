//! Audit and alert sinks (§7, SPEC_FULL §6).
//!
//! Persistent audit storage and the actual alert transport (PagerDuty,
//! Slack, email) are external collaborators; the core only emits through
//! these trait seams and owns the alert-cooldown suppression logic §7
//! requires. `NullAuditSink` is the default no-op; `VecAuditSink` is a
//! test-only in-memory recorder.

pub mod alert;
pub mod record;
pub mod sink;

pub use alert::{AlertCooldownTracker, AlertSink, NullAlertSink, OperationsAlert, Severity, VecAlertSink};
pub use record::{AuditRecord, Outcome};
pub use sink::{AuditSink, NullAuditSink, VecAuditSink};
