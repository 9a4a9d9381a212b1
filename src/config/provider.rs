//! `ConfigurationProvider` trait (SPEC_FULL §6).
//!
//! Scoped to what the sync core itself consumes: rate-limit overrides,
//! opaque per-adapter connection settings, and the per-(tenant, provider)
//! transformation rule set and sync settings the reconciler and polling
//! service read every tick. The teacher's full bulk/backup/cache surface
//! on `TenantConfigurationProvider` belongs to the SCIM-protocol
//! configuration it manages, not this gateway's narrower config plane.

use async_trait::async_trait;
use serde_json::Value;

use crate::rate_limit::RateLimitConfig;
use crate::reconcile::SyncSettings;
use crate::transform::TransformationRule;

/// Opaque, adapter-specific connection settings (base URL, credential
/// reference, timeouts). The core never interprets the `settings` blob;
/// each adapter implementation parses the shape it expects.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterConfiguration {
    pub provider_id: String,
    pub settings: Value,
}

impl AdapterConfiguration {
    pub fn new(provider_id: impl Into<String>, settings: Value) -> Self {
        Self {
            provider_id: provider_id.into(),
            settings,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("no configuration found for key '{key}'")]
    NotFound { key: String },
}

pub type ConfigurationResult<T> = Result<T, ConfigurationError>;

/// Source of truth for tenant- and provider-scoped configuration. The
/// core reads through this seam on every poll tick and transform call;
/// persistence (database, file, remote config service) is the
/// implementation's concern.
#[async_trait]
pub trait ConfigurationProvider: Send + Sync {
    async fn rate_limit_config(&self, tenant_id: &str) -> ConfigurationResult<RateLimitConfig>;

    async fn set_rate_limit_config(
        &self,
        tenant_id: &str,
        config: RateLimitConfig,
    ) -> ConfigurationResult<()>;

    async fn adapter_configuration(
        &self,
        provider_id: &str,
    ) -> ConfigurationResult<Option<AdapterConfiguration>>;

    async fn set_adapter_configuration(
        &self,
        config: AdapterConfiguration,
    ) -> ConfigurationResult<()>;

    async fn transformation_rules(
        &self,
        tenant_id: &str,
        provider_id: &str,
    ) -> ConfigurationResult<Vec<TransformationRule>>;

    async fn set_transformation_rules(
        &self,
        tenant_id: &str,
        provider_id: &str,
        rules: Vec<TransformationRule>,
    ) -> ConfigurationResult<()>;

    async fn sync_settings(
        &self,
        tenant_id: &str,
        provider_id: &str,
    ) -> ConfigurationResult<SyncSettings>;

    async fn set_sync_settings(
        &self,
        tenant_id: &str,
        provider_id: &str,
        settings: SyncSettings,
    ) -> ConfigurationResult<()>;
}
