//! Stateless change detector (§4.5): compares two normalized resource
//! snapshots (previous sync pass vs. current poll) and emits drift
//! entries. Takes no adapter or tenant dependency — callers supply
//! already-fetched, already-normalized snapshots keyed by resource id.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use super::types::{DriftLogEntry, DriftType};

/// SHA-256 content hash of a snapshot value, base64-encoded. Used as a
/// cheap equality short-circuit before falling back to a field diff.
pub fn content_hash(value: &Value) -> String {
    let serialized = value.to_string();
    let digest = Sha256::digest(serialized.as_bytes());
    STANDARD.encode(digest)
}

/// Compare `previous` and `current` snapshots (resource id -> normalized
/// value) for one resource type and return the drift entries (§4.5).
/// Unchanged resources (equal content hash) are omitted entirely.
pub fn detect_drift(
    previous: &HashMap<String, Value>,
    current: &HashMap<String, Value>,
    resource_type: &str,
    now: DateTime<Utc>,
) -> Vec<DriftLogEntry> {
    let mut entries = Vec::new();

    for (id, new_value) in current {
        match previous.get(id) {
            None => entries.push(DriftLogEntry::new(
                id,
                resource_type,
                DriftType::Added,
                None,
                Some(new_value.clone()),
                now,
            )),
            Some(old_value) => {
                if content_hash(old_value) == content_hash(new_value) {
                    continue;
                }
                if resource_type.eq_ignore_ascii_case("Group") {
                    if let Some(entry) = membership_mismatch(id, old_value, new_value, now) {
                        entries.push(entry);
                        continue;
                    }
                }
                let (old_diff, new_diff) = diff_changed_attributes(old_value, new_value);
                entries.push(DriftLogEntry::new(
                    id,
                    resource_type,
                    DriftType::Modified,
                    Some(old_diff),
                    Some(new_diff),
                    now,
                ));
            }
        }
    }

    for (id, old_value) in previous {
        if !current.contains_key(id) {
            entries.push(DriftLogEntry::new(
                id,
                resource_type,
                DriftType::Deleted,
                Some(old_value.clone()),
                None,
                now,
            ));
        }
    }

    entries
}

/// Top-level attribute diff: only keys whose value differs appear in
/// either output, at attribute granularity (not a deep recursive diff).
fn diff_changed_attributes(old: &Value, new: &Value) -> (Value, Value) {
    let mut old_diff = serde_json::Map::new();
    let mut new_diff = serde_json::Map::new();

    if let (Value::Object(o), Value::Object(n)) = (old, new) {
        let mut keys: Vec<&String> = o.keys().chain(n.keys()).collect();
        keys.sort();
        keys.dedup();
        for key in keys {
            let ov = o.get(key).cloned().unwrap_or(Value::Null);
            let nv = n.get(key).cloned().unwrap_or(Value::Null);
            if ov != nv {
                old_diff.insert(key.clone(), ov);
                new_diff.insert(key.clone(), nv);
            }
        }
    }

    (Value::Object(old_diff), Value::Object(new_diff))
}

fn extract_member_ids(value: &Value) -> Vec<String> {
    let mut ids: Vec<String> = value
        .get("members")
        .and_then(Value::as_array)
        .map(|members| {
            members
                .iter()
                .filter_map(|m| m.get("value").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    ids.sort();
    ids
}

fn without_members(value: &Value) -> Value {
    let mut v = value.clone();
    if let Some(obj) = v.as_object_mut() {
        obj.remove("members");
    }
    v
}

/// A group drift is a pure membership mismatch only when every other
/// top-level attribute is unchanged; otherwise the caller falls back to
/// the general `Modified` path, which still captures the members field.
fn membership_mismatch(id: &str, old: &Value, new: &Value, now: DateTime<Utc>) -> Option<DriftLogEntry> {
    let old_ids = extract_member_ids(old);
    let new_ids = extract_member_ids(new);
    if old_ids == new_ids {
        return None;
    }
    if without_members(old) != without_members(new) {
        return None;
    }

    let added: Vec<&String> = new_ids.iter().filter(|m| !old_ids.contains(m)).collect();
    let removed: Vec<&String> = old_ids.iter().filter(|m| !new_ids.contains(m)).collect();

    Some(DriftLogEntry::new(
        id,
        "Group",
        DriftType::MembershipMismatch,
        None,
        Some(json!({ "added": added, "removed": removed })),
        now,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_added_resource() {
        let previous = HashMap::new();
        let current = snapshot(&[("u1", json!({"userName": "alice"}))]);
        let drift = detect_drift(&previous, &current, "User", Utc::now());
        assert_eq!(drift.len(), 1);
        assert_eq!(drift[0].drift_type, DriftType::Added);
        assert!(drift[0].old_value.is_none());
    }

    #[test]
    fn test_deleted_resource() {
        let previous = snapshot(&[("u1", json!({"userName": "alice"}))]);
        let current = HashMap::new();
        let drift = detect_drift(&previous, &current, "User", Utc::now());
        assert_eq!(drift.len(), 1);
        assert_eq!(drift[0].drift_type, DriftType::Deleted);
        assert!(drift[0].new_value.is_none());
    }

    #[test]
    fn test_unchanged_resource_produces_no_drift() {
        let value = json!({"userName": "alice", "active": true});
        let previous = snapshot(&[("u1", value.clone())]);
        let current = snapshot(&[("u1", value)]);
        assert!(detect_drift(&previous, &current, "User", Utc::now()).is_empty());
    }

    #[test]
    fn test_modified_resource_reports_only_changed_attributes() {
        let previous = snapshot(&[("u1", json!({"userName": "alice", "active": true}))]);
        let current = snapshot(&[("u1", json!({"userName": "alice", "active": false}))]);
        let drift = detect_drift(&previous, &current, "User", Utc::now());
        assert_eq!(drift.len(), 1);
        assert_eq!(drift[0].drift_type, DriftType::Modified);
        assert_eq!(drift[0].old_value, Some(json!({"active": true})));
        assert_eq!(drift[0].new_value, Some(json!({"active": false})));
    }

    #[test]
    fn test_membership_mismatch_isolated_from_other_attribute_changes() {
        let previous = snapshot(&[(
            "g1",
            json!({"displayName": "Sales", "members": [{"value": "u1"}, {"value": "u2"}]}),
        )]);
        let current = snapshot(&[(
            "g1",
            json!({"displayName": "Sales", "members": [{"value": "u1"}, {"value": "u3"}]}),
        )]);
        let drift = detect_drift(&previous, &current, "Group", Utc::now());
        assert_eq!(drift.len(), 1);
        assert_eq!(drift[0].drift_type, DriftType::MembershipMismatch);
        assert_eq!(
            drift[0].new_value,
            Some(json!({"added": ["u3"], "removed": ["u2"]}))
        );
    }

    #[test]
    fn test_membership_change_plus_other_attribute_falls_back_to_modified() {
        let previous = snapshot(&[(
            "g1",
            json!({"displayName": "Sales", "members": [{"value": "u1"}]}),
        )]);
        let current = snapshot(&[(
            "g1",
            json!({"displayName": "Sales EMEA", "members": [{"value": "u1"}, {"value": "u2"}]}),
        )]);
        let drift = detect_drift(&previous, &current, "Group", Utc::now());
        assert_eq!(drift.len(), 1);
        assert_eq!(drift[0].drift_type, DriftType::Modified);
    }
}
