//! The adapter capability contract (§4.1).
//!
//! The adapter abstraction is the only polymorphic surface in the core
//! (§9 Design Notes): an explicit capability contract (this trait plus
//! [`Capabilities`]) rather than an inheritance chain. It is defined with
//! [`async_trait`] — native return-position `impl Future` would be
//! simpler, but the registry stores heterogeneous adapters behind
//! `Arc<dyn Adapter>`, and native `impl Trait` in trait methods is not
//! object-safe — unlike [`crate::storage::StorageProvider`], which has no
//! such requirement and uses native `impl Future` returns instead.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::AdapterResult;
use crate::resource::{PagedResult, QueryFilter, Resource};

use super::capabilities::Capabilities;
use super::entitlement::EntitlementMapping;

/// Result of an adapter's `checkHealth` diagnostic (§4.1).
#[derive(Debug, Clone, PartialEq)]
pub enum HealthStatus {
    Healthy,
    Degraded { reason: String },
    Unhealthy { reason: String },
}

/// The fixed capability surface every adapter exposes (§4.1):
/// User/Group CRUD+list, Membership, Transformation, Diagnostics.
///
/// **Contracts.** `get_user`/`get_group` return `Ok(None)` when the
/// resource is absent — absence is not an error. All other operations
/// fail with a typed [`crate::error::AdapterError`]. `create_user`/
/// `create_group` MUST fail with `Uniqueness` on a duplicate
/// `userName`/`displayName`. `update_user`/`update_group` of an absent id
/// MUST fail with `ResourceNotFound`.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Stable identifier for this adapter instance (e.g. `salesforce-prod`).
    fn adapter_id(&self) -> &str;

    /// The upstream provider's display name (e.g. `Salesforce`).
    fn provider_name(&self) -> &str;

    /// The capability surface this adapter advertises (§4.1 supplement).
    fn capabilities(&self) -> Capabilities;

    async fn create_user(&self, data: Value) -> AdapterResult<Resource>;
    async fn get_user(&self, id: &str) -> AdapterResult<Option<Resource>>;
    async fn update_user(&self, id: &str, data: Value) -> AdapterResult<Resource>;
    async fn delete_user(&self, id: &str) -> AdapterResult<()>;
    async fn list_users(&self, filter: &QueryFilter) -> AdapterResult<PagedResult<Resource>>;

    async fn create_group(&self, data: Value) -> AdapterResult<Resource>;
    async fn get_group(&self, id: &str) -> AdapterResult<Option<Resource>>;
    async fn update_group(&self, id: &str, data: Value) -> AdapterResult<Resource>;
    async fn delete_group(&self, id: &str) -> AdapterResult<()>;
    async fn list_groups(&self, filter: &QueryFilter) -> AdapterResult<PagedResult<Resource>>;

    async fn add_user_to_group(&self, group_id: &str, user_id: &str) -> AdapterResult<()>;
    async fn remove_user_from_group(&self, group_id: &str, user_id: &str) -> AdapterResult<()>;
    async fn list_members(&self, group_id: &str) -> AdapterResult<Vec<String>>;

    /// Provider-native group→entitlement projection (distinct from the
    /// rule-driven transformation engine in §4.4, which composes with
    /// this when an adapter has no native mapping of its own).
    async fn map_group_to_entitlement(&self, group: &Resource) -> AdapterResult<Vec<EntitlementMapping>>;
    async fn map_entitlement_to_group(&self, entitlement: &EntitlementMapping) -> AdapterResult<Resource>;

    async fn check_health(&self) -> AdapterResult<HealthStatus>;
}
