//! Audit record shape (§7): `{operationType, resourceType, resourceId?,
//! tenantId, providerId, actorId, adapterId, outcome, durationMs,
//! providerErrorCode?, errorMessage?, correlationId}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Whether the audited operation succeeded or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Success,
    Failure,
}

/// One audit record, emitted for every operation regardless of outcome
/// (§7). Sensitive payload fields (credentials, tokens) must be redacted
/// before a record is constructed; this type carries no raw payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub operation_type: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub tenant_id: String,
    pub provider_id: String,
    pub actor_id: String,
    pub adapter_id: String,
    pub outcome: Outcome,
    pub duration_ms: u64,
    pub provider_error_code: Option<String>,
    pub error_message: Option<String>,
    pub correlation_id: String,
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        operation_type: impl Into<String>,
        resource_type: impl Into<String>,
        tenant_id: impl Into<String>,
        provider_id: impl Into<String>,
        actor_id: impl Into<String>,
        adapter_id: impl Into<String>,
        outcome: Outcome,
        duration_ms: u64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            operation_type: operation_type.into(),
            resource_type: resource_type.into(),
            resource_id: None,
            tenant_id: tenant_id.into(),
            provider_id: provider_id.into(),
            actor_id: actor_id.into(),
            adapter_id: adapter_id.into(),
            outcome,
            duration_ms,
            provider_error_code: None,
            error_message: None,
            correlation_id: Uuid::new_v4().to_string(),
            timestamp: now,
        }
    }

    pub fn with_resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn with_error(mut self, provider_error_code: Option<String>, message: impl Into<String>) -> Self {
        self.provider_error_code = provider_error_code;
        self.error_message = Some(message.into());
        self
    }
}
