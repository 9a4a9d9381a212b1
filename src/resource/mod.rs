//! Resource model and request context for SCIM resources.
//!
//! This module defines the core resource abstractions used throughout the
//! gateway: the JSON-backed [`Resource`] representation, the tenant-aware
//! request context, and tenant isolation. Dual-modification detection
//! (§4.6) is content-hash based ([`crate::drift::content_hash`]) rather
//! than version-token based, since the core never owns a write path of
//! its own to mint version tokens against — adapters are the write path.
//!
//! # Module Organization
//!
//! * [`core`] - [`Resource`] and its accessors
//! * [`context`] - [`RequestContext`], [`EnhancedRequestContext`], [`QueryFilter`], [`PagedResult`]
//! * [`tenant`] - [`TenantContext`], [`IsolationLevel`], [`TenantPermissions`]

pub mod context;
pub mod core;
pub mod tenant;

pub use context::{
    ClaimsSource, EnhancedRequestContext, ListQuery, PagedResult, QueryFilter, RequestContext,
    SortOrder, TenantResolutionError,
};
pub use core::{Resource, ResourceError};
pub use tenant::{IsolationLevel, TenantContext, TenantPermissions};
