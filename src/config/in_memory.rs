//! In-memory [`ConfigurationProvider`], suitable for tests and single-node
//! deployments, mirroring the teacher's `InMemoryConfigurationProvider`
//! storage shape (`Arc<RwLock<HashMap<...>>>` per configuration kind).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::rate_limit::RateLimitConfig;
use crate::reconcile::SyncSettings;
use crate::transform::TransformationRule;

use super::provider::{AdapterConfiguration, ConfigurationError, ConfigurationProvider, ConfigurationResult};

fn tenant_provider_key(tenant_id: &str, provider_id: &str) -> String {
    format!("{tenant_id}::{provider_id}")
}

#[derive(Default)]
pub struct InMemoryConfigurationProvider {
    rate_limits: Arc<RwLock<HashMap<String, RateLimitConfig>>>,
    adapter_configs: Arc<RwLock<HashMap<String, AdapterConfiguration>>>,
    rules: Arc<RwLock<HashMap<String, Vec<TransformationRule>>>>,
    sync_settings: Arc<RwLock<HashMap<String, SyncSettings>>>,
}

impl InMemoryConfigurationProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConfigurationProvider for InMemoryConfigurationProvider {
    async fn rate_limit_config(&self, tenant_id: &str) -> ConfigurationResult<RateLimitConfig> {
        Ok(self
            .rate_limits
            .read()
            .await
            .get(tenant_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn set_rate_limit_config(
        &self,
        tenant_id: &str,
        config: RateLimitConfig,
    ) -> ConfigurationResult<()> {
        self.rate_limits.write().await.insert(tenant_id.to_string(), config);
        Ok(())
    }

    async fn adapter_configuration(
        &self,
        provider_id: &str,
    ) -> ConfigurationResult<Option<AdapterConfiguration>> {
        Ok(self.adapter_configs.read().await.get(provider_id).cloned())
    }

    async fn set_adapter_configuration(&self, config: AdapterConfiguration) -> ConfigurationResult<()> {
        self.adapter_configs
            .write()
            .await
            .insert(config.provider_id.clone(), config);
        Ok(())
    }

    async fn transformation_rules(
        &self,
        tenant_id: &str,
        provider_id: &str,
    ) -> ConfigurationResult<Vec<TransformationRule>> {
        let key = tenant_provider_key(tenant_id, provider_id);
        Ok(self.rules.read().await.get(&key).cloned().unwrap_or_default())
    }

    async fn set_transformation_rules(
        &self,
        tenant_id: &str,
        provider_id: &str,
        rules: Vec<TransformationRule>,
    ) -> ConfigurationResult<()> {
        let key = tenant_provider_key(tenant_id, provider_id);
        self.rules.write().await.insert(key, rules);
        Ok(())
    }

    async fn sync_settings(
        &self,
        tenant_id: &str,
        provider_id: &str,
    ) -> ConfigurationResult<SyncSettings> {
        let key = tenant_provider_key(tenant_id, provider_id);
        match self.sync_settings.read().await.get(&key) {
            Some(settings) => Ok(settings.clone()),
            None => Err(ConfigurationError::NotFound { key }),
        }
    }

    async fn set_sync_settings(
        &self,
        tenant_id: &str,
        provider_id: &str,
        settings: SyncSettings,
    ) -> ConfigurationResult<()> {
        let key = tenant_provider_key(tenant_id, provider_id);
        self.sync_settings.write().await.insert(key, settings);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{ConflictResolution, RuleType};

    #[tokio::test]
    async fn rate_limit_config_defaults_when_unset() {
        let provider = InMemoryConfigurationProvider::new();
        let config = provider.rate_limit_config("tenant-a").await.unwrap();
        assert_eq!(config.bucket_capacity, RateLimitConfig::default().bucket_capacity);
    }

    #[tokio::test]
    async fn sync_settings_not_found_until_set() {
        let provider = InMemoryConfigurationProvider::new();
        assert!(provider.sync_settings("tenant-a", "provider-a").await.is_err());

        provider
            .set_sync_settings("tenant-a", "provider-a", SyncSettings::default())
            .await
            .unwrap();
        let settings = provider.sync_settings("tenant-a", "provider-a").await.unwrap();
        assert_eq!(settings.interval_minutes, SyncSettings::default().interval_minutes);
    }

    #[tokio::test]
    async fn transformation_rules_round_trip() {
        let provider = InMemoryConfigurationProvider::new();
        let rule = TransformationRule::new(
            "r1",
            "tenant-a",
            "provider-a",
            RuleType::Exact,
            "Engineering",
            "eng-access",
        )
        .with_conflict_resolution(ConflictResolution::Union);

        provider
            .set_transformation_rules("tenant-a", "provider-a", vec![rule.clone()])
            .await
            .unwrap();
        let stored = provider.transformation_rules("tenant-a", "provider-a").await.unwrap();
        assert_eq!(stored, vec![rule]);
    }
}
