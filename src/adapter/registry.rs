//! Adapter registry (§4.1).
//!
//! Maps `providerId` (case-insensitive) to a live adapter instance, keeps
//! a `tenantId → set<providerId>` ACL, and a set of administratively
//! disabled `providerId`s. The registry owns adapter instances exclusively
//! (§3 Ownership); adapters are reference-counted so `refresh` can run
//! concurrently with in-flight calls without interrupting them.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::{RegistryError, RegistryResult};

use super::traits::{Adapter, HealthStatus};

struct Inner {
    adapters: HashMap<String, Arc<dyn Adapter>>,
    tenant_acl: HashMap<String, HashSet<String>>,
    disabled: HashSet<String>,
}

/// Error surfaced by [`AdapterRegistry::refresh`], which can fail either
/// because the provider isn't registered or because its health check did.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Adapter(#[from] crate::error::AdapterError),
}

/// Thread-safe, cloneable handle to the adapter registry.
#[derive(Clone)]
pub struct AdapterRegistry {
    inner: Arc<RwLock<Inner>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                adapters: HashMap::new(),
                tenant_acl: HashMap::new(),
                disabled: HashSet::new(),
            })),
        }
    }

    fn normalize(provider_id: &str) -> String {
        provider_id.to_ascii_lowercase()
    }

    /// Register a new adapter instance. Fails if `providerId` is already
    /// registered (distinct environments, e.g. `salesforce-prod` vs
    /// `salesforce-sandbox`, are distinct `providerId`s and register fine).
    pub async fn register(&self, adapter: Arc<dyn Adapter>) -> RegistryResult<()> {
        let key = Self::normalize(adapter.adapter_id());
        let mut inner = self.inner.write().await;
        if inner.adapters.contains_key(&key) {
            return Err(RegistryError::DuplicateRegistration { provider_id: key });
        }
        inner.adapters.insert(key, adapter);
        Ok(())
    }

    pub async fn unregister(&self, provider_id: &str) -> RegistryResult<()> {
        let key = Self::normalize(provider_id);
        let mut inner = self.inner.write().await;
        inner
            .adapters
            .remove(&key)
            .ok_or_else(|| RegistryError::UnknownProvider {
                provider_id: key.clone(),
            })?;
        inner.disabled.remove(&key);
        Ok(())
    }

    /// Look up an adapter by `providerId` without tenant ACL or disabled
    /// checks (used by operational/diagnostic callers).
    pub async fn get(&self, provider_id: &str) -> RegistryResult<Arc<dyn Adapter>> {
        let key = Self::normalize(provider_id);
        let inner = self.inner.read().await;
        inner
            .adapters
            .get(&key)
            .cloned()
            .ok_or(RegistryError::UnknownProvider { provider_id: key })
    }

    /// Look up an adapter on behalf of a tenant, enforcing the ACL and the
    /// disabled set (§4.1). Fails with `AdapterNotFound`-equivalent
    /// `TenantNotAuthorized` if the tenant's ACL doesn't include
    /// `providerId`, or `AdapterDisabled` if administratively suspended.
    pub async fn get_for_tenant(
        &self,
        tenant_id: &str,
        provider_id: &str,
    ) -> RegistryResult<Arc<dyn Adapter>> {
        let key = Self::normalize(provider_id);
        let inner = self.inner.read().await;
        let authorized = inner
            .tenant_acl
            .get(tenant_id)
            .is_some_and(|set| set.contains(&key));
        if !authorized {
            return Err(RegistryError::TenantNotAuthorized {
                tenant_id: tenant_id.to_string(),
                provider_id: key,
            });
        }
        if inner.disabled.contains(&key) {
            return Err(RegistryError::AdapterDisabled { provider_id: key });
        }
        inner
            .adapters
            .get(&key)
            .cloned()
            .ok_or(RegistryError::UnknownProvider { provider_id: key })
    }

    /// Grant a tenant access to a provider. Idempotent.
    pub async fn grant_tenant_access(&self, tenant_id: &str, provider_id: &str) {
        let key = Self::normalize(provider_id);
        let mut inner = self.inner.write().await;
        inner
            .tenant_acl
            .entry(tenant_id.to_string())
            .or_default()
            .insert(key);
    }

    pub async fn revoke_tenant_access(&self, tenant_id: &str, provider_id: &str) {
        let key = Self::normalize(provider_id);
        let mut inner = self.inner.write().await;
        if let Some(set) = inner.tenant_acl.get_mut(tenant_id) {
            set.remove(&key);
        }
    }

    pub async fn enable(&self, provider_id: &str) {
        let key = Self::normalize(provider_id);
        self.inner.write().await.disabled.remove(&key);
    }

    pub async fn disable(&self, provider_id: &str) {
        let key = Self::normalize(provider_id);
        self.inner.write().await.disabled.insert(key);
    }

    pub async fn is_disabled(&self, provider_id: &str) -> bool {
        let key = Self::normalize(provider_id);
        self.inner.read().await.disabled.contains(&key)
    }

    /// Trigger the adapter's own `checkHealth` and republish its
    /// capabilities. Reads the adapter through the shared `Arc`, so
    /// in-flight calls on other clones are never interrupted.
    pub async fn refresh(&self, provider_id: &str) -> Result<HealthStatus, RefreshError> {
        let adapter = self.get(provider_id).await?;
        let status = adapter.check_health().await?;
        Ok(status)
    }

    pub async fn list_all(&self) -> Vec<Arc<dyn Adapter>> {
        self.inner.read().await.adapters.values().cloned().collect()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::mock::MockAdapter;

    #[tokio::test]
    async fn test_register_and_get() {
        let registry = AdapterRegistry::new();
        let adapter = Arc::new(MockAdapter::new("salesforce-prod", "Salesforce"));
        registry.register(adapter.clone()).await.unwrap();
        let found = registry.get("Salesforce-Prod").await.unwrap();
        assert_eq!(found.adapter_id(), "salesforce-prod");
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let registry = AdapterRegistry::new();
        registry
            .register(Arc::new(MockAdapter::new("p1", "Provider One")))
            .await
            .unwrap();
        let err = registry
            .register(Arc::new(MockAdapter::new("p1", "Provider One Again")))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateRegistration { .. }));
    }

    #[tokio::test]
    async fn test_get_for_tenant_requires_acl() {
        let registry = AdapterRegistry::new();
        registry
            .register(Arc::new(MockAdapter::new("p1", "Provider One")))
            .await
            .unwrap();
        let err = registry.get_for_tenant("tenant-a", "p1").await.unwrap_err();
        assert!(matches!(err, RegistryError::TenantNotAuthorized { .. }));

        registry.grant_tenant_access("tenant-a", "p1").await;
        registry.get_for_tenant("tenant-a", "p1").await.unwrap();
    }

    #[tokio::test]
    async fn test_disabled_adapter_rejected_for_tenant() {
        let registry = AdapterRegistry::new();
        registry
            .register(Arc::new(MockAdapter::new("p1", "Provider One")))
            .await
            .unwrap();
        registry.grant_tenant_access("tenant-a", "p1").await;
        registry.disable("p1").await;

        let err = registry.get_for_tenant("tenant-a", "p1").await.unwrap_err();
        assert!(matches!(err, RegistryError::AdapterDisabled { .. }));

        registry.enable("p1").await;
        registry.get_for_tenant("tenant-a", "p1").await.unwrap();
    }

    #[tokio::test]
    async fn test_unregister_unknown_provider() {
        let registry = AdapterRegistry::new();
        let err = registry.unregister("ghost").await.unwrap_err();
        assert!(matches!(err, RegistryError::UnknownProvider { .. }));
    }

    #[tokio::test]
    async fn test_refresh_reports_health_without_interrupting() {
        let registry = AdapterRegistry::new();
        registry
            .register(Arc::new(MockAdapter::new("p1", "Provider One")))
            .await
            .unwrap();
        let status = registry.refresh("p1").await.unwrap();
        assert_eq!(status, HealthStatus::Healthy);
    }
}
