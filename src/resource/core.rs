//! Canonical SCIM resource representation.
//!
//! A [`Resource`] is a thin, JSON-backed wrapper around a SCIM User or Group.
//! The gateway core does not validate resource content against a schema —
//! that responsibility belongs to the upstream HTTP surface (see spec
//! non-goals) — it only needs enough structure to identify resources, walk
//! group membership, and compute a version token for optimistic concurrency.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Generic SCIM resource representation.
///
/// A resource is a structured data object with a type identifier and JSON
/// data. This design keeps the core schema-agnostic while still exposing
/// the handful of attributes (`id`, `externalId`, `userName`/`displayName`,
/// `members`, `meta`) the synchronization core actually needs to reason
/// about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// The type of this resource ("User" or "Group").
    pub resource_type: String,
    /// The resource data as JSON.
    pub data: Value,
}

impl Resource {
    /// Create a new resource with the given type and data.
    pub fn new(resource_type: String, data: Value) -> Self {
        Self {
            resource_type,
            data,
        }
    }

    /// Create a resource, failing if `data` is not a JSON object.
    pub fn from_json(resource_type: String, data: Value) -> Result<Self, ResourceError> {
        if !data.is_object() {
            return Err(ResourceError::NotAnObject);
        }
        Ok(Self::new(resource_type, data))
    }

    /// Get the unique identifier of this resource.
    pub fn get_id(&self) -> Option<&str> {
        self.data.get("id")?.as_str()
    }

    /// Get the externalId of this resource, if present.
    pub fn get_external_id(&self) -> Option<&str> {
        self.data.get("externalId")?.as_str()
    }

    /// Get the userName field for User resources.
    pub fn get_username(&self) -> Option<&str> {
        self.data.get("userName")?.as_str()
    }

    /// Get the displayName field, used by both User and Group resources.
    pub fn get_display_name(&self) -> Option<&str> {
        self.data.get("displayName")?.as_str()
    }

    /// Get a specific attribute value from the resource data.
    pub fn get_attribute(&self, attribute_name: &str) -> Option<&Value> {
        self.data.get(attribute_name)
    }

    /// Set a specific attribute value in the resource data.
    pub fn set_attribute(&mut self, attribute_name: impl Into<String>, value: Value) {
        if let Some(obj) = self.data.as_object_mut() {
            obj.insert(attribute_name.into(), value);
        }
    }

    /// Get the schemas associated with this resource, defaulting to the
    /// canonical core schema URI for the resource type if absent.
    pub fn get_schemas(&self) -> Vec<String> {
        self.data
            .get("schemas")
            .and_then(|s| s.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str())
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_else(|| match self.resource_type.as_str() {
                "User" => vec!["urn:ietf:params:scim:schemas:core:2.0:User".to_string()],
                "Group" => vec!["urn:ietf:params:scim:schemas:core:2.0:Group".to_string()],
                _ => vec![],
            })
    }

    /// Get the member ids of a Group resource, sorted for deterministic
    /// comparison (used by the change detector's membership diff).
    pub fn get_member_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .data
            .get("members")
            .and_then(|m| m.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|m| m.get("value").and_then(|v| v.as_str()))
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_default();
        ids.sort();
        ids
    }

    /// Check if this resource is active (Users only); defaults to true.
    pub fn is_active(&self) -> bool {
        self.data
            .get("active")
            .and_then(|v| v.as_bool())
            .unwrap_or(true)
    }

    /// Attach server-managed `meta` attributes.
    pub fn set_meta(&mut self, resource_type: &str, created: &str, last_modified: &str) {
        let meta = serde_json::json!({
            "resourceType": resource_type,
            "created": created,
            "lastModified": last_modified,
        });
        self.set_attribute("meta", meta);
    }

    /// Return the resource's JSON representation (used for hashing and by
    /// providers that serialize resources onto the wire).
    pub fn to_json(&self) -> Value {
        self.data.clone()
    }

    /// A stable, order-independent serialization used for content hashing
    /// (snapshot checksums, drift detection). Keys are already sorted by
    /// `serde_json`'s default map ordering is insertion order, so we
    /// normalize through a `BTreeMap`-backed round-trip.
    pub fn normalized(&self) -> Value {
        normalize_value(&self.data)
    }
}

fn normalize_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted: std::collections::BTreeMap<String, Value> =
                std::collections::BTreeMap::new();
            for (k, v) in map {
                sorted.insert(k.clone(), normalize_value(v));
            }
            serde_json::to_value(sorted).unwrap_or(Value::Null)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(normalize_value).collect()),
        other => other.clone(),
    }
}

/// Errors constructing a [`Resource`].
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    /// The supplied JSON value was not an object.
    #[error("resource data must be a JSON object")]
    NotAnObject,
}
