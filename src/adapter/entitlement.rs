//! Entitlement Mapping data model (§3), used both by an adapter's native
//! `mapGroupToEntitlement`/`mapEntitlementToGroup` surface (§4.1) and by
//! the transformation engine's conflict-resolution metadata (§4.4).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The provider-specific shape an entitlement takes (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntitlementType {
    Role,
    PermissionSet,
    OrgHierarchyLevel,
    Group,
    Department,
    Custom,
}

/// `{providerId, providerEntitlementId, name, type, mappedGroups[], priority,
/// enabled, metadata}` (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitlementMapping {
    pub provider_id: String,
    pub provider_entitlement_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub entitlement_type: EntitlementType,
    pub mapped_groups: Vec<String>,
    /// Privilege rank used by the `HIGHEST_PRIVILEGE` conflict strategy
    /// (§4.4); higher is more privileged.
    pub priority: i32,
    pub enabled: bool,
    pub metadata: HashMap<String, String>,
}

impl EntitlementMapping {
    pub fn new(
        provider_id: impl Into<String>,
        provider_entitlement_id: impl Into<String>,
        name: impl Into<String>,
        entitlement_type: EntitlementType,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            provider_entitlement_id: provider_entitlement_id.into(),
            name: name.into(),
            entitlement_type,
            mapped_groups: Vec::new(),
            priority: 0,
            enabled: true,
            metadata: HashMap::new(),
        }
    }

    pub fn with_mapped_group(mut self, group_id: impl Into<String>) -> Self {
        self.mapped_groups.push(group_id.into());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}
