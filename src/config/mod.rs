//! Configuration provider seam (SPEC_FULL §6), generalizing the teacher's
//! `multi_tenant::config_provider`/`config_inmemory` pair from per-tenant
//! SCIM configuration to the gateway's broader surface: rate-limit
//! overrides, per-adapter connection settings, and per-(tenant, provider)
//! transformation rules and sync settings.

pub mod in_memory;
pub mod provider;

pub use in_memory::InMemoryConfigurationProvider;
pub use provider::{AdapterConfiguration, ConfigurationError, ConfigurationProvider};
