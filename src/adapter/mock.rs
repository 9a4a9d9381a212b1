//! In-memory mock adapter (§8 Testable Properties: "MockAdapter must"
//! support bidirectional group/entitlement identity). Used by the core's
//! own tests and as a reference implementation for new adapters.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AdapterError, AdapterResult};
use crate::resource::{PagedResult, QueryFilter, Resource, SortOrder};

use super::capabilities::Capabilities;
use super::entitlement::{EntitlementMapping, EntitlementType};
use super::filter::{evaluate, parse_filter};
use super::traits::{Adapter, HealthStatus};

#[derive(Default)]
struct Store {
    users: HashMap<String, Resource>,
    groups: HashMap<String, Resource>,
}

/// A fully in-memory [`Adapter`] backed by `HashMap`s, suitable for tests
/// and local development. Honors the full filter operator set and
/// advertises a configurable `max_page_size`.
pub struct MockAdapter {
    adapter_id: String,
    provider_name: String,
    capabilities: Capabilities,
    store: Arc<RwLock<Store>>,
}

impl MockAdapter {
    pub fn new(adapter_id: impl Into<String>, provider_name: impl Into<String>) -> Self {
        Self {
            adapter_id: adapter_id.into(),
            provider_name: provider_name.into(),
            capabilities: Capabilities::default(),
            store: Arc::new(RwLock::new(Store::default())),
        }
    }

    pub fn with_max_page_size(mut self, max_page_size: usize) -> Self {
        self.capabilities.max_page_size = max_page_size;
        self
    }

    fn not_found(&self, operation: &str, resource_type: &str, id: &str) -> AdapterError {
        AdapterError::from_status(&self.adapter_id, &self.provider_name, operation, Some(404), None)
            .with_resource(resource_type, id)
    }

    fn uniqueness(&self, operation: &str, resource_type: &str, id: &str) -> AdapterError {
        AdapterError::from_status(&self.adapter_id, &self.provider_name, operation, Some(409), None)
            .with_resource(resource_type, id)
    }

    fn invalid_filter(&self, operation: &str, message: &str) -> AdapterError {
        AdapterError::from_status(&self.adapter_id, &self.provider_name, operation, Some(400), Some(message.to_string()))
    }

    async fn create(&self, resource_type: &str, mut data: Value, operation: &str) -> AdapterResult<Resource> {
        let key_field = if resource_type == "User" { "userName" } else { "displayName" };
        let key_value = data.get(key_field).and_then(|v| v.as_str()).map(str::to_string);

        let mut store = self.store.write().await;
        let map = if resource_type == "User" { &mut store.users } else { &mut store.groups };

        if let Some(ref kv) = key_value {
            let duplicate = map.values().any(|r| {
                let existing = if resource_type == "User" { r.get_username() } else { r.get_display_name() };
                existing == Some(kv.as_str())
            });
            if duplicate {
                return Err(self.uniqueness(operation, resource_type, kv));
            }
        }

        let id = data
            .get("id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        if let Some(obj) = data.as_object_mut() {
            obj.insert("id".to_string(), Value::String(id.clone()));
        }
        let resource = Resource::new(resource_type.to_string(), data);
        map.insert(id, resource.clone());
        Ok(resource)
    }

    async fn get(&self, resource_type: &str, id: &str) -> AdapterResult<Option<Resource>> {
        let store = self.store.read().await;
        let map = if resource_type == "User" { &store.users } else { &store.groups };
        Ok(map.get(id).cloned())
    }

    async fn update(&self, resource_type: &str, id: &str, data: Value, operation: &str) -> AdapterResult<Resource> {
        let mut store = self.store.write().await;
        let map = if resource_type == "User" { &mut store.users } else { &mut store.groups };
        if !map.contains_key(id) {
            return Err(self.not_found(operation, resource_type, id));
        }
        let mut data = data;
        if let Some(obj) = data.as_object_mut() {
            obj.insert("id".to_string(), Value::String(id.to_string()));
        }
        let resource = Resource::new(resource_type.to_string(), data);
        map.insert(id.to_string(), resource.clone());
        Ok(resource)
    }

    async fn delete(&self, resource_type: &str, id: &str, operation: &str) -> AdapterResult<()> {
        let mut store = self.store.write().await;
        let map = if resource_type == "User" { &mut store.users } else { &mut store.groups };
        map.remove(id).ok_or_else(|| self.not_found(operation, resource_type, id))?;
        Ok(())
    }

    async fn list(&self, resource_type: &str, filter: &QueryFilter, operation: &str) -> AdapterResult<PagedResult<Resource>> {
        if !filter.is_valid() {
            return Err(self.invalid_filter(operation, "startIndex/count out of range"));
        }
        let store = self.store.read().await;
        let map = if resource_type == "User" { &store.users } else { &store.groups };

        let mut matched: Vec<Resource> = if let Some(filter_str) = &filter.filter {
            let expr = parse_filter(filter_str).map_err(|e| self.invalid_filter(operation, &e.to_string()))?;
            map.values().filter(|r| evaluate(&expr, r)).cloned().collect()
        } else {
            map.values().cloned().collect()
        };

        if let Some(sort_by) = &filter.sort_by {
            matched.sort_by(|a, b| {
                let av = a.get_attribute(sort_by).and_then(|v| v.as_str()).unwrap_or_default();
                let bv = b.get_attribute(sort_by).and_then(|v| v.as_str()).unwrap_or_default();
                match filter.sort_order {
                    SortOrder::Ascending => av.cmp(bv),
                    SortOrder::Descending => bv.cmp(av),
                }
            });
        } else {
            matched.sort_by(|a, b| a.get_id().unwrap_or_default().cmp(b.get_id().unwrap_or_default()));
        }

        let total_results = matched.len();
        let clamped_count = self.capabilities.clamp_count(filter.count);
        let skip = filter.start_index.saturating_sub(1);
        let page: Vec<Resource> = matched.into_iter().skip(skip).take(clamped_count).collect();
        let items_per_page = page.len();

        Ok(PagedResult {
            resources: page,
            total_results,
            start_index: filter.start_index,
            items_per_page,
        })
    }
}

#[async_trait]
impl Adapter for MockAdapter {
    fn adapter_id(&self) -> &str {
        &self.adapter_id
    }

    fn provider_name(&self) -> &str {
        &self.provider_name
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities.clone()
    }

    async fn create_user(&self, data: Value) -> AdapterResult<Resource> {
        self.create("User", data, "createUser").await
    }

    async fn get_user(&self, id: &str) -> AdapterResult<Option<Resource>> {
        self.get("User", id).await
    }

    async fn update_user(&self, id: &str, data: Value) -> AdapterResult<Resource> {
        self.update("User", id, data, "updateUser").await
    }

    async fn delete_user(&self, id: &str) -> AdapterResult<()> {
        self.delete("User", id, "deleteUser").await
    }

    async fn list_users(&self, filter: &QueryFilter) -> AdapterResult<PagedResult<Resource>> {
        self.list("User", filter, "listUsers").await
    }

    async fn create_group(&self, data: Value) -> AdapterResult<Resource> {
        self.create("Group", data, "createGroup").await
    }

    async fn get_group(&self, id: &str) -> AdapterResult<Option<Resource>> {
        self.get("Group", id).await
    }

    async fn update_group(&self, id: &str, data: Value) -> AdapterResult<Resource> {
        self.update("Group", id, data, "updateGroup").await
    }

    async fn delete_group(&self, id: &str) -> AdapterResult<()> {
        self.delete("Group", id, "deleteGroup").await
    }

    async fn list_groups(&self, filter: &QueryFilter) -> AdapterResult<PagedResult<Resource>> {
        self.list("Group", filter, "listGroups").await
    }

    async fn add_user_to_group(&self, group_id: &str, user_id: &str) -> AdapterResult<()> {
        let mut store = self.store.write().await;
        let group = store
            .groups
            .get_mut(group_id)
            .ok_or_else(|| self.not_found("addUserToGroup", "Group", group_id))?;
        let members = group.data.get("members").and_then(|m| m.as_array()).cloned().unwrap_or_default();
        let mut members = members;
        if !members.iter().any(|m| m.get("value").and_then(|v| v.as_str()) == Some(user_id)) {
            members.push(serde_json::json!({"value": user_id}));
        }
        group.set_attribute("members", Value::Array(members));
        Ok(())
    }

    async fn remove_user_from_group(&self, group_id: &str, user_id: &str) -> AdapterResult<()> {
        let mut store = self.store.write().await;
        let group = store
            .groups
            .get_mut(group_id)
            .ok_or_else(|| self.not_found("removeUserFromGroup", "Group", group_id))?;
        let members = group.data.get("members").and_then(|m| m.as_array()).cloned().unwrap_or_default();
        let filtered: Vec<Value> = members
            .into_iter()
            .filter(|m| m.get("value").and_then(|v| v.as_str()) != Some(user_id))
            .collect();
        group.set_attribute("members", Value::Array(filtered));
        Ok(())
    }

    async fn list_members(&self, group_id: &str) -> AdapterResult<Vec<String>> {
        let store = self.store.read().await;
        let group = store
            .groups
            .get(group_id)
            .ok_or_else(|| self.not_found("listMembers", "Group", group_id))?;
        Ok(group.get_member_ids())
    }

    async fn map_group_to_entitlement(&self, group: &Resource) -> AdapterResult<Vec<EntitlementMapping>> {
        let id = group.get_id().unwrap_or_default().to_string();
        let name = group.get_display_name().unwrap_or_default().to_string();
        let mapping = EntitlementMapping::new(self.provider_name.clone(), id.clone(), name, EntitlementType::Group)
            .with_mapped_group(id);
        Ok(vec![mapping])
    }

    async fn map_entitlement_to_group(&self, entitlement: &EntitlementMapping) -> AdapterResult<Resource> {
        let data = serde_json::json!({
            "id": entitlement.provider_entitlement_id,
            "displayName": entitlement.name,
        });
        Ok(Resource::new("Group".to_string(), data))
    }

    async fn check_health(&self) -> AdapterResult<HealthStatus> {
        Ok(HealthStatus::Healthy)
    }
}
