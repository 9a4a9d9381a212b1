//! Request context and query structures for SCIM operations.
//!
//! [`RequestContext`] is the plain, possibly-tenant-free context threaded
//! through a single-tenant adapter call.
//! [`EnhancedRequestContext`] is the richer, tenant-mandatory context
//! resolved once per inbound request from validated claims (§4.3) and is
//! immutable for the lifetime of that request.

use crate::resource::tenant::{IsolationLevel, TenantContext};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

/// Request context for SCIM operations.
///
/// Provides request tracking for logging and auditing purposes.
/// Optionally includes tenant context for multi-tenant operations.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique identifier for this request
    pub request_id: String,
    /// Optional tenant context for multi-tenant operations
    pub tenant_context: Option<TenantContext>,
}

impl RequestContext {
    /// Create a new request context with a specific request ID.
    pub fn new(request_id: String) -> Self {
        Self {
            request_id,
            tenant_context: None,
        }
    }

    /// Create a new request context with a generated request ID.
    pub fn with_generated_id() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            tenant_context: None,
        }
    }

    /// Create a new request context with tenant information.
    pub fn with_tenant(request_id: String, tenant_context: TenantContext) -> Self {
        Self {
            request_id,
            tenant_context: Some(tenant_context),
        }
    }

    /// Create a new request context with generated ID and tenant information.
    pub fn with_tenant_generated_id(tenant_context: TenantContext) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            tenant_context: Some(tenant_context),
        }
    }

    /// Get the tenant ID if this is a multi-tenant request.
    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_context.as_ref().map(|t| t.tenant_id.as_str())
    }

    /// Get the client ID if this is a multi-tenant request.
    pub fn client_id(&self) -> Option<&str> {
        self.tenant_context.as_ref().map(|t| t.client_id.as_str())
    }

    /// Check if this is a multi-tenant request.
    pub fn is_multi_tenant(&self) -> bool {
        self.tenant_context.is_some()
    }

    /// Get the isolation level for this request.
    pub fn isolation_level(&self) -> Option<&IsolationLevel> {
        self.tenant_context.as_ref().map(|t| &t.isolation_level)
    }

    /// Check if the tenant has permission for a specific operation.
    pub fn can_perform_operation(&self, operation: &str) -> bool {
        match &self.tenant_context {
            Some(tenant) => tenant.can_perform_operation(operation),
            None => true, // Single-tenant operations are always allowed
        }
    }

    /// Validate that this context can perform the requested operation.
    pub fn validate_operation(&self, operation: &str) -> Result<(), String> {
        if self.can_perform_operation(operation) {
            Ok(())
        } else {
            Err(format!(
                "Operation '{}' not permitted for tenant",
                operation
            ))
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::with_generated_id()
    }
}

/// Errors resolving an [`EnhancedRequestContext`] from inbound claims.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TenantResolutionError {
    /// The `tenantId` claim was missing or empty.
    #[error("missing or empty 'tenantId' claim")]
    MissingTenantId,
    /// The `actorId` claim was missing or empty.
    #[error("missing or empty 'actorId' claim")]
    MissingActorId,
}

/// Source of claims for resolving an [`EnhancedRequestContext`] (§4.3).
/// Token validation itself stays an external collaborator; this trait
/// only hands the core the already-validated claim set.
pub trait ClaimsSource {
    fn claims(&self) -> &HashMap<String, String>;
}

/// The per-request tenant context resolved from validated claims (§4.3).
///
/// Created once per inbound request and discarded at response. Every
/// downstream access receives this context; any resource whose
/// `tenant_id` differs from `context.tenant_id` must fail with
/// `CrossTenantAccess` regardless of other permissions (enforced by
/// [`EnhancedRequestContext::check_same_tenant`]).
#[derive(Debug, Clone)]
pub struct EnhancedRequestContext {
    /// Unique identifier for this request.
    pub request_id: String,
    /// Optional correlation id for distributed tracing, propagated from
    /// an inbound header if present.
    pub correlation_id: Option<String>,
    /// The tenant id this request is scoped to. Non-empty by construction.
    pub tenant_id: String,
    /// The actor (end user or service principal) performing the request.
    /// Non-empty by construction.
    pub actor_id: String,
    /// True when `tenant_id == actor_id`, i.e. the caller authenticated as
    /// a service principal rather than an individual user.
    pub is_service_principal: bool,
    /// OAuth-style scopes granted to this request.
    pub scopes: Vec<String>,
    /// Roles granted to this request.
    pub roles: Vec<String>,
    /// Token expiry, if the upstream claim set carries one.
    pub expires_at: Option<DateTime<Utc>>,
    /// Tenant configuration (isolation level, CRUD permissions) looked up
    /// alongside the claims.
    pub tenant_context: TenantContext,
}

impl EnhancedRequestContext {
    /// Resolve a context directly from an existing [`TenantContext`],
    /// generating a fresh request id and treating the tenant's client as
    /// the actor.
    pub fn with_generated_id(tenant_context: TenantContext) -> Self {
        let actor_id = tenant_context.client_id.clone();
        let tenant_id = tenant_context.tenant_id.clone();
        let is_service_principal = actor_id == tenant_id;
        Self {
            request_id: Uuid::new_v4().to_string(),
            correlation_id: None,
            tenant_id,
            actor_id,
            is_service_principal,
            scopes: Vec::new(),
            roles: Vec::new(),
            expires_at: None,
            tenant_context,
        }
    }

    /// Resolve a context from a [`ClaimsSource`] (§4.3). Fails with
    /// [`TenantResolutionError`] when `tenantId` or `actorId` is missing
    /// or empty.
    pub fn from_claims(
        source: &impl ClaimsSource,
        tenant_context: TenantContext,
    ) -> Result<Self, TenantResolutionError> {
        let claims = source.claims();
        let tenant_id = claims
            .get("tenantId")
            .map(|s| s.as_str())
            .filter(|s| !s.is_empty())
            .ok_or(TenantResolutionError::MissingTenantId)?
            .to_string();
        let actor_id = claims
            .get("actorId")
            .map(|s| s.as_str())
            .filter(|s| !s.is_empty())
            .ok_or(TenantResolutionError::MissingActorId)?
            .to_string();
        let is_service_principal = actor_id == tenant_id;
        let scopes = claims
            .get("scopes")
            .map(|s| s.split(' ').map(str::to_string).collect())
            .unwrap_or_default();
        let roles = claims
            .get("roles")
            .map(|s| s.split(',').map(str::to_string).collect())
            .unwrap_or_default();
        let correlation_id = claims.get("correlationId").cloned();

        Ok(Self {
            request_id: Uuid::new_v4().to_string(),
            correlation_id,
            tenant_id,
            actor_id,
            is_service_principal,
            scopes,
            roles,
            expires_at: None,
            tenant_context,
        })
    }

    /// Convenience accessor mirroring [`RequestContext::tenant_id`].
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Convenience accessor for the client id of the underlying tenant
    /// configuration.
    pub fn client_id(&self) -> &str {
        &self.tenant_context.client_id
    }

    /// Get the isolation level for this request.
    pub fn isolation_level(&self) -> &IsolationLevel {
        &self.tenant_context.isolation_level
    }

    /// Check if the tenant has permission for a specific operation.
    pub fn can_perform_operation(&self, operation: &str) -> bool {
        self.tenant_context.can_perform_operation(operation)
    }

    /// Validate that this context can perform the requested operation.
    pub fn validate_operation(&self, operation: &str) -> Result<(), String> {
        if self.can_perform_operation(operation) {
            Ok(())
        } else {
            Err(format!(
                "Operation '{}' not permitted for tenant",
                operation
            ))
        }
    }

    /// Enforce tenant isolation: any resource whose `tenant_id` differs
    /// from this context's must be rejected, regardless of other
    /// permissions (`CrossTenantAccess`, §4.3).
    pub fn check_same_tenant(&self, resource_tenant_id: &str) -> Result<(), String> {
        if resource_tenant_id == self.tenant_id {
            Ok(())
        } else {
            Err(format!(
                "cross-tenant access denied: context is scoped to '{}', resource belongs to '{}'",
                self.tenant_id, resource_tenant_id
            ))
        }
    }

    /// Downgrade to a plain [`RequestContext`] for passing into a
    /// single-tenant caller.
    pub fn to_request_context(&self) -> RequestContext {
        RequestContext::with_tenant(self.request_id.clone(), self.tenant_context.clone())
    }
}

impl TryFrom<RequestContext> for EnhancedRequestContext {
    type Error = String;

    fn try_from(context: RequestContext) -> Result<Self, Self::Error> {
        match context.tenant_context {
            Some(tenant_context) => {
                let mut enhanced = EnhancedRequestContext::with_generated_id(tenant_context);
                enhanced.request_id = context.request_id;
                Ok(enhanced)
            }
            None => Err(format!(
                "RequestContext '{}' does not contain tenant information",
                context.request_id
            )),
        }
    }
}

/// Sort direction for [`QueryFilter`] list operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Query parameters for listing resources (§3 `Query Filter`).
///
/// Supports pagination, filtering, sorting, and attribute selection for
/// SCIM list operations. `startIndex` is 1-based per RFC 7644.
#[derive(Debug, Clone)]
pub struct QueryFilter {
    /// SCIM filter expression, if any.
    pub filter: Option<String>,
    /// Attributes to include in results.
    pub attributes: Vec<String>,
    /// Attributes to exclude from results.
    pub excluded: Vec<String>,
    /// Attribute to sort by, if any.
    pub sort_by: Option<String>,
    /// Sort direction, defaulting to ascending.
    pub sort_order: SortOrder,
    /// 1-based starting index.
    pub start_index: usize,
    /// Page size, 1..=1000.
    pub count: usize,
}

impl Default for QueryFilter {
    fn default() -> Self {
        Self {
            filter: None,
            attributes: Vec::new(),
            excluded: Vec::new(),
            sort_by: None,
            sort_order: SortOrder::Ascending,
            start_index: 1,
            count: 100,
        }
    }
}

impl QueryFilter {
    /// Create a new default query.
    pub fn new() -> Self {
        Self::default()
    }

    /// `startIndex>=1 ∧ 1<=count<=1000`.
    pub fn is_valid(&self) -> bool {
        self.start_index >= 1 && self.count >= 1 && self.count <= 1000
    }

    /// Clamp `count` to an adapter-advertised maximum page size.
    pub fn clamped_count(&self, max_page_size: usize) -> usize {
        self.count.min(max_page_size)
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_start_index(mut self, start_index: usize) -> Self {
        self.start_index = start_index;
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attributes.push(attribute.into());
        self
    }

    pub fn with_excluded_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.excluded.push(attribute.into());
        self
    }

    pub fn with_sort(mut self, sort_by: impl Into<String>, order: SortOrder) -> Self {
        self.sort_by = Some(sort_by.into());
        self.sort_order = order;
        self
    }
}

/// A type alias for callers that prefer the older `ListQuery` name.
pub type ListQuery = QueryFilter;

/// `Paged Result<T>` (§3): a page of resources plus enough metadata to
/// compute whether more pages remain.
#[derive(Debug, Clone)]
pub struct PagedResult<T> {
    pub resources: Vec<T>,
    pub total_results: usize,
    pub start_index: usize,
    pub items_per_page: usize,
}

impl<T> PagedResult<T> {
    pub fn new(
        resources: Vec<T>,
        total_results: usize,
        start_index: usize,
        items_per_page: usize,
    ) -> Self {
        Self {
            resources,
            total_results,
            start_index,
            items_per_page,
        }
    }

    /// `hasMore ⇔ startIndex + itemsPerPage <= totalResults`.
    pub fn has_more(&self) -> bool {
        self.start_index + self.items_per_page <= self.total_results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::tenant::TenantPermissions;

    struct MapClaims(HashMap<String, String>);
    impl ClaimsSource for MapClaims {
        fn claims(&self) -> &HashMap<String, String> {
            &self.0
        }
    }

    #[test]
    fn test_request_context_conversion() {
        let tenant_context = TenantContext::new("test".to_string(), "client".to_string());
        let regular = RequestContext::with_tenant("req-123".to_string(), tenant_context);

        let enhanced: Result<EnhancedRequestContext, _> = regular.try_into();
        assert!(enhanced.is_ok());
        let enhanced = enhanced.unwrap();
        assert_eq!(enhanced.tenant_id(), "test");
        assert_eq!(enhanced.request_id, "req-123");
    }

    #[test]
    fn test_request_context_conversion_failure() {
        let regular = RequestContext::new("req-123".to_string());
        let enhanced: Result<EnhancedRequestContext, _> = regular.try_into();
        assert!(enhanced.is_err());
    }

    #[test]
    fn test_from_claims_requires_tenant_and_actor() {
        let tenant_context = TenantContext::new("tenant-a".to_string(), "client-a".to_string());
        let mut claims = HashMap::new();
        claims.insert("actorId".to_string(), "user-1".to_string());
        let err = EnhancedRequestContext::from_claims(&MapClaims(claims), tenant_context.clone())
            .unwrap_err();
        assert_eq!(err, TenantResolutionError::MissingTenantId);

        let mut claims = HashMap::new();
        claims.insert("tenantId".to_string(), "tenant-a".to_string());
        let err =
            EnhancedRequestContext::from_claims(&MapClaims(claims), tenant_context).unwrap_err();
        assert_eq!(err, TenantResolutionError::MissingActorId);
    }

    #[test]
    fn test_from_claims_service_principal() {
        let tenant_context = TenantContext::new("tenant-a".to_string(), "tenant-a".to_string());
        let mut claims = HashMap::new();
        claims.insert("tenantId".to_string(), "tenant-a".to_string());
        claims.insert("actorId".to_string(), "tenant-a".to_string());
        let ctx =
            EnhancedRequestContext::from_claims(&MapClaims(claims), tenant_context).unwrap();
        assert!(ctx.is_service_principal);
    }

    #[test]
    fn test_check_same_tenant() {
        let tenant_context = TenantContext::new("tenant-a".to_string(), "client".to_string());
        let ctx = EnhancedRequestContext::with_generated_id(tenant_context);
        assert!(ctx.check_same_tenant("tenant-a").is_ok());
        assert!(ctx.check_same_tenant("tenant-b").is_err());
    }

    #[test]
    fn test_query_filter_validity() {
        assert!(QueryFilter::new().is_valid());
        assert!(!QueryFilter::new().with_start_index(0).is_valid());
        assert!(!QueryFilter::new().with_count(0).is_valid());
        assert!(!QueryFilter::new().with_count(1001).is_valid());
        assert!(QueryFilter::new().with_count(1000).is_valid());
    }

    #[test]
    fn test_query_filter_clamping() {
        let q = QueryFilter::new().with_count(500);
        assert_eq!(q.clamped_count(100), 100);
        assert_eq!(q.clamped_count(1000), 500);
    }

    #[test]
    fn test_paged_result_has_more() {
        let page = PagedResult::new(vec![1, 2], 10, 1, 2);
        assert!(page.has_more());
        let last_page = PagedResult::new(vec![1, 2], 10, 9, 2);
        assert!(!last_page.has_more());
        let done = PagedResult::new(vec![1, 2], 10, 11, 2);
        assert!(!done.has_more());
    }

    #[test]
    fn test_tenant_permission_gate_on_enhanced_context() {
        let mut permissions = TenantPermissions::default();
        permissions.can_delete = false;
        let tenant_context =
            TenantContext::new("t".to_string(), "c".to_string()).with_permissions(permissions);
        let ctx = EnhancedRequestContext::with_generated_id(tenant_context);
        assert!(ctx.validate_operation("delete").is_err());
        assert!(ctx.validate_operation("read").is_ok());
    }
}
