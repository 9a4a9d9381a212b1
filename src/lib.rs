//! # SCIM Gateway Core
//!
//! The multi-tenant synchronization and dispatch core for a SCIM 2.0
//! gateway: adapter abstraction and registry, rate limiting and
//! auth-lockout tracking, tenant isolation, group-to-entitlement
//! transformation, drift detection, reconciliation, and the polling
//! service that drives them. The HTTP surface, token validation, schema
//! validation, persistent audit storage, secret store integration, and
//! provider wire protocols are external collaborators; this crate exposes
//! trait seams for them rather than implementing them.
//!
//! ## Dependency order
//!
//! Error taxonomy → adapter abstraction → rate limiter / tenant context →
//! transformation engine → change detector → reconciler → polling
//! service, matching the module list below.

pub mod adapter;
pub mod audit;
pub mod config;
pub mod drift;
pub mod error;
pub mod poll;
pub mod rate_limit;
pub mod reconcile;
pub mod resource;
pub mod storage;
pub mod transform;

pub use adapter::{Adapter, AdapterRegistry, Capabilities, EntitlementMapping, EntitlementType};
pub use audit::{
    AlertCooldownTracker, AlertSink, AuditRecord, AuditSink, NullAlertSink, NullAuditSink, Outcome,
    OperationsAlert, Severity, VecAlertSink, VecAuditSink,
};
pub use config::{AdapterConfiguration, ConfigurationProvider, InMemoryConfigurationProvider};
pub use drift::{content_hash, detect_drift, DriftLogEntry, DriftType};
pub use error::{
    AdapterError, RateLimitError, ReconcileError, RegistryError, ScimErrorKind, TransformError,
};
pub use poll::{CancellationSignal, CancellationToken, PollingService, SyncState, SyncStatus, TickOutcome};
pub use rate_limit::{AdmissionResult, LockoutStatus, RateLimiter};
pub use reconcile::{Direction, ReconcileOutcome, ReconcileStrategy, Reconciler, SyncSettings};
pub use resource::{
    EnhancedRequestContext, PagedResult, QueryFilter, RequestContext, Resource, TenantContext,
};
pub use transform::{ConflictResolution, TransformationEngine, TransformationRule};
