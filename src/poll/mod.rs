//! Polling service (§4.7): scheduled fan-out over `(tenant, provider)`
//! pairs, owning [`SyncState`] and driving the change detector
//! ([`crate::drift`]) and reconciler ([`crate::reconcile`]) each tick.

pub mod retry;
pub mod service;
pub mod types;

pub use retry::{with_retry, with_retry_counted};
pub use service::{PollingService, TickOutcome};
pub use types::{CancellationSignal, CancellationToken, SyncState, SyncStateSnapshot, SyncStatus};
