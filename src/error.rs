//! Error taxonomy for the gateway core (§7).
//!
//! [`ScimErrorKind`] is the classification every adapter/provider failure
//! is translated into before it crosses a subsystem boundary. Each
//! subsystem (adapter dispatch, transformation, reconciliation, the
//! registry, rate limiting) gets its own `thiserror`-derived error enum,
//! all of which expose a [`ScimErrorKind`] so the caller can decide
//! whether to retry, alert, or surface a SCIM error body without caring
//! which subsystem raised it.

use std::fmt;
use std::time::Duration;

/// The twelve classified error kinds plus the catch-all `Unknown` (§7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScimErrorKind {
    InvalidSyntax,
    Uniqueness,
    Mutability,
    InvalidFilter,
    NoTarget,
    TooMany,
    ServerUnavailable,
    ResourceNotFound,
    Unauthorized,
    Forbidden,
    RateLimitExceeded,
    Timeout,
    InternalError,
    Unknown,
}

impl ScimErrorKind {
    /// Classify a transport failure by its HTTP status code (§6 table).
    /// A missing status classifies as `InternalError` (§7 translation rule).
    pub fn from_http_status(status: Option<u16>) -> Self {
        match status {
            Some(400) => ScimErrorKind::InvalidSyntax,
            Some(401) => ScimErrorKind::Unauthorized,
            Some(403) => ScimErrorKind::Forbidden,
            Some(404) => ScimErrorKind::ResourceNotFound,
            Some(408) => ScimErrorKind::Timeout,
            Some(409) => ScimErrorKind::Uniqueness,
            Some(429) => ScimErrorKind::RateLimitExceeded,
            Some(500) => ScimErrorKind::InternalError,
            Some(503) => ScimErrorKind::ServerUnavailable,
            Some(_) => ScimErrorKind::Unknown,
            None => ScimErrorKind::InternalError,
        }
    }

    /// The HTTP status this kind maps back to (§6 table), where defined.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ScimErrorKind::InvalidSyntax => Some(400),
            ScimErrorKind::InvalidFilter => Some(400),
            ScimErrorKind::Mutability => Some(400),
            ScimErrorKind::NoTarget => Some(400),
            ScimErrorKind::TooMany => Some(400),
            ScimErrorKind::Unauthorized => Some(401),
            ScimErrorKind::Forbidden => Some(403),
            ScimErrorKind::ResourceNotFound => Some(404),
            ScimErrorKind::Timeout => Some(408),
            ScimErrorKind::Uniqueness => Some(409),
            ScimErrorKind::RateLimitExceeded => Some(429),
            ScimErrorKind::InternalError => Some(500),
            ScimErrorKind::ServerUnavailable => Some(503),
            ScimErrorKind::Unknown => None,
        }
    }

    /// The SCIM `scimType` string for this kind, when the SCIM error
    /// schema defines one (§6).
    pub fn scim_type(&self) -> Option<&'static str> {
        match self {
            ScimErrorKind::InvalidSyntax => Some("invalidSyntax"),
            ScimErrorKind::InvalidFilter => Some("invalidFilter"),
            ScimErrorKind::Mutability => Some("mutability"),
            ScimErrorKind::NoTarget => Some("noTarget"),
            ScimErrorKind::TooMany => Some("tooMany"),
            ScimErrorKind::Uniqueness => Some("uniqueness"),
            _ => None,
        }
    }

    /// `isRetryable = status ∈ {408, 429, 503} ∨ class(network)` (§7).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ScimErrorKind::Timeout
                | ScimErrorKind::RateLimitExceeded
                | ScimErrorKind::ServerUnavailable
        )
    }

    /// Critical kinds that alert immediately rather than after retries are
    /// exhausted (§7 Alerting).
    pub fn is_critical(&self) -> bool {
        matches!(self, ScimErrorKind::Unauthorized | ScimErrorKind::Forbidden)
    }
}

impl fmt::Display for ScimErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScimErrorKind::InvalidSyntax => "InvalidSyntax",
            ScimErrorKind::Uniqueness => "Uniqueness",
            ScimErrorKind::Mutability => "Mutability",
            ScimErrorKind::InvalidFilter => "InvalidFilter",
            ScimErrorKind::NoTarget => "NoTarget",
            ScimErrorKind::TooMany => "TooMany",
            ScimErrorKind::ServerUnavailable => "ServerUnavailable",
            ScimErrorKind::ResourceNotFound => "ResourceNotFound",
            ScimErrorKind::Unauthorized => "Unauthorized",
            ScimErrorKind::Forbidden => "Forbidden",
            ScimErrorKind::RateLimitExceeded => "RateLimitExceeded",
            ScimErrorKind::Timeout => "Timeout",
            ScimErrorKind::InternalError => "InternalError",
            ScimErrorKind::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// An error raised by an adapter operation, carrying enough context for
/// audit records and alerting (§4.1, §7).
#[derive(Debug, Clone, thiserror::Error)]
#[error("adapter '{adapter_id}' ({provider_name}) failed during {operation}: {scim_error_kind}{resource_suffix}", resource_suffix = self.resource_suffix())]
pub struct AdapterError {
    /// The upstream provider's name (e.g. "Okta", "Workday").
    pub provider_name: String,
    /// The HTTP status the provider returned, if the failure was
    /// transport-level.
    pub http_status: Option<u16>,
    /// The provider's own error code, retained verbatim; never alters
    /// classification (§7 Translation).
    pub provider_error_code: Option<String>,
    /// The classified error kind.
    pub scim_error_kind: ScimErrorKind,
    /// Whether the caller should retry this operation.
    pub is_retryable: bool,
    /// Seconds to wait before retrying, if the provider or classification
    /// suggests one.
    pub retry_after_seconds: Option<u64>,
    /// The adapter instance that raised this error.
    pub adapter_id: String,
    /// The operation being performed (e.g. "getUser", "listGroups").
    pub operation: String,
    /// The resource id involved, if any.
    pub resource_id: Option<String>,
    /// The resource type involved, if any.
    pub resource_type: Option<String>,
}

impl AdapterError {
    /// Construct an `AdapterError` by translating an HTTP status per the
    /// §6 table, unwrapping classification from the status alone.
    pub fn from_status(
        adapter_id: impl Into<String>,
        provider_name: impl Into<String>,
        operation: impl Into<String>,
        http_status: Option<u16>,
        provider_error_code: Option<String>,
    ) -> Self {
        let scim_error_kind = ScimErrorKind::from_http_status(http_status);
        let is_retryable = scim_error_kind.is_retryable();
        Self {
            provider_name: provider_name.into(),
            http_status,
            provider_error_code,
            scim_error_kind,
            is_retryable,
            retry_after_seconds: None,
            adapter_id: adapter_id.into(),
            operation: operation.into(),
            resource_id: None,
            resource_type: None,
        }
    }

    pub fn with_resource(
        mut self,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        self.resource_type = Some(resource_type.into());
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after_seconds = Some(retry_after.as_secs());
        self
    }

    fn resource_suffix(&self) -> String {
        match (&self.resource_type, &self.resource_id) {
            (Some(rt), Some(rid)) => format!(" ({rt} {rid})"),
            _ => String::new(),
        }
    }
}

/// Errors raised by the transformation engine (§4.4).
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransformError {
    #[error("rule '{rule_id}' references capture group {group} which the pattern does not have")]
    MissingCaptureGroup { rule_id: String, group: usize },

    #[error("rule '{rule_id}' references hierarchy level {level} beyond the split depth {depth}")]
    HierarchyLevelOutOfRange {
        rule_id: String,
        level: usize,
        depth: usize,
    },

    #[error("conflicting entitlements for group '{group_id}' require manual review")]
    ManualReviewRequired { group_id: String },

    #[error("conflicting entitlements for group '{group_id}' under ERROR strategy")]
    ConflictError { group_id: String },

    #[error("invalid regex pattern in rule '{rule_id}': {message}")]
    InvalidPattern { rule_id: String, message: String },
}

impl TransformError {
    pub fn kind(&self) -> ScimErrorKind {
        match self {
            TransformError::MissingCaptureGroup { .. }
            | TransformError::HierarchyLevelOutOfRange { .. }
            | TransformError::InvalidPattern { .. } => ScimErrorKind::InvalidSyntax,
            TransformError::ManualReviewRequired { .. } | TransformError::ConflictError { .. } => {
                ScimErrorKind::InternalError
            }
        }
    }
}

/// Errors raised by the reconciler (§4.6).
#[derive(Debug, Clone, thiserror::Error)]
pub enum ReconcileError {
    #[error("adapter call failed during reconciliation: {0}")]
    Adapter(#[from] AdapterError),

    #[error("resource '{resource_id}' has an unresolved conflict; skipping reconcile")]
    UnresolvedConflict { resource_id: String },

    #[error("no sync state found for tenant '{tenant_id}' provider '{provider_id}'")]
    MissingSyncState {
        tenant_id: String,
        provider_id: String,
    },
}

/// Errors raised by the adapter registry (§4.1).
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    #[error("no adapter registered for provider '{provider_id}'")]
    UnknownProvider { provider_id: String },

    #[error("adapter '{provider_id}' is disabled")]
    AdapterDisabled { provider_id: String },

    #[error("tenant '{tenant_id}' is not authorized to use provider '{provider_id}'")]
    TenantNotAuthorized {
        tenant_id: String,
        provider_id: String,
    },

    #[error("an adapter is already registered for provider '{provider_id}'")]
    DuplicateRegistration { provider_id: String },
}

/// Errors raised by the rate limiter / lockout tracker (§4.2).
#[derive(Debug, Clone, thiserror::Error)]
pub enum RateLimitError {
    #[error("rate limit exceeded for key '{key}', retry after {retry_after_seconds}s")]
    Exceeded {
        key: String,
        retry_after_seconds: u64,
    },

    #[error("actor '{actor}' is locked out, retry after {retry_after_seconds}s")]
    LockedOut {
        actor: String,
        retry_after_seconds: u64,
    },
}

impl RateLimitError {
    pub fn kind(&self) -> ScimErrorKind {
        match self {
            RateLimitError::Exceeded { .. } => ScimErrorKind::RateLimitExceeded,
            RateLimitError::LockedOut { .. } => ScimErrorKind::Forbidden,
        }
    }

    pub fn retry_after_seconds(&self) -> u64 {
        match self {
            RateLimitError::Exceeded {
                retry_after_seconds,
                ..
            }
            | RateLimitError::LockedOut {
                retry_after_seconds,
                ..
            } => *retry_after_seconds,
        }
    }
}

pub type AdapterResult<T> = Result<T, AdapterError>;
pub type TransformResult<T> = Result<T, TransformError>;
pub type ReconcileResult<T> = Result<T, ReconcileError>;
pub type RegistryResult<T> = Result<T, RegistryError>;
pub type RateLimitResult<T> = Result<T, RateLimitError>;
