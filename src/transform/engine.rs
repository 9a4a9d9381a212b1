//! Transformation engine: rule evaluation order and conflict resolution
//! over the matched set (§4.4).

use std::collections::HashMap;

use chrono::Utc;

use crate::adapter::EntitlementMapping;
use crate::error::TransformError;

use super::conflict::{ConflictLogEntry, ConflictType};
use super::rule::{ConflictResolution, TransformationRule};

/// One rule's successful match, preserving priority order.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedEntitlement {
    pub rule_id: String,
    pub priority: i32,
    pub target: String,
}

/// The result of transforming a group through a rule set (§4.4).
#[derive(Debug, Clone, PartialEq)]
pub struct TransformOutcome {
    /// All matches, in priority order, before conflict resolution.
    pub matches: Vec<MatchedEntitlement>,
    /// The final entitlement set after applying the configured conflict
    /// strategy. Empty when `MANUAL_REVIEW` withholds output.
    pub resolved: Vec<String>,
    /// Present only when `MANUAL_REVIEW` fired (§4.4).
    pub conflict: Option<ConflictLogEntry>,
}

/// A preview transform response (§4.4): `{matchedRuleId,
/// transformedEntitlement, conflicts[], appliedAt=null}`. Preview never
/// persists, never invokes an adapter, and never emits an audit record.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewResult {
    pub matched_rule_id: Option<String>,
    pub transformed_entitlement: Option<String>,
    pub conflicts: Vec<ConflictLogEntry>,
}

/// A stateless rule-evaluation engine. All state (rule sets, entitlement
/// metadata) is supplied by the caller per call, consistent with the
/// change detector's statelessness in §4.5.
#[derive(Debug, Default, Clone, Copy)]
pub struct TransformationEngine;

impl TransformationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Transform a group's display name through `rules` (filtered to
    /// `enabled`, sorted by `priority` ascending, per §4.4 evaluation
    /// order) and apply conflict resolution when more than one rule
    /// matches. `entitlements`, keyed by target mapping string, supplies
    /// privilege rank for `HIGHEST_PRIVILEGE`.
    pub fn transform_group(
        &self,
        rules: &[TransformationRule],
        group_id: &str,
        group_display_name: &str,
        entitlements: &HashMap<String, EntitlementMapping>,
    ) -> Result<TransformOutcome, TransformError> {
        let mut enabled: Vec<&TransformationRule> = rules.iter().filter(|r| r.enabled).collect();
        enabled.sort_by_key(|r| r.priority);

        let mut matches = Vec::new();
        for rule in &enabled {
            if let Some(target) = rule.evaluate(group_display_name)? {
                matches.push(MatchedEntitlement {
                    rule_id: rule.id.clone(),
                    priority: rule.priority,
                    target,
                });
            }
        }

        if matches.len() <= 1 {
            let resolved = matches.first().map(|m| m.target.clone()).into_iter().collect();
            return Ok(TransformOutcome { matches, resolved, conflict: None });
        }

        // The resolution strategy is taken from the highest-priority
        // matched rule, since conflictResolution is defined per-rule but
        // a tenant/provider's rule set conventionally shares one value.
        let strategy = enabled
            .iter()
            .find(|r| r.id == matches[0].rule_id)
            .map(|r| r.conflict_resolution)
            .unwrap_or(ConflictResolution::Union);

        match strategy {
            ConflictResolution::Union => {
                let resolved = matches.iter().map(|m| m.target.clone()).collect();
                Ok(TransformOutcome { matches, resolved, conflict: None })
            }
            ConflictResolution::FirstMatch => {
                let resolved = vec![matches[0].target.clone()];
                Ok(TransformOutcome { matches, resolved, conflict: None })
            }
            ConflictResolution::HighestPrivilege => {
                let winner = matches
                    .iter()
                    .max_by_key(|m| {
                        let privilege = entitlements.get(&m.target).map(|e| e.priority).unwrap_or(0);
                        // Ties broken by rule priority ascending (lower wins),
                        // so negate it for the max-by-key comparison.
                        (privilege, -m.priority)
                    })
                    .expect("matches is non-empty here");
                let resolved = vec![winner.target.clone()];
                Ok(TransformOutcome { matches, resolved, conflict: None })
            }
            ConflictResolution::ManualReview => {
                let conflict = ConflictLogEntry::new(
                    group_id,
                    "Group",
                    ConflictType::TransformationConflict,
                    "MANUAL_REVIEW",
                    Utc::now(),
                );
                Ok(TransformOutcome { matches, resolved: vec![], conflict: Some(conflict) })
            }
            ConflictResolution::Error => Err(TransformError::ConflictError {
                group_id: group_id.to_string(),
            }),
        }
    }

    /// Preview a transform without persisting or invoking an adapter
    /// (§4.4). Reports only the first match and any conflict; never
    /// emits an audit record (enforced by callers simply not calling the
    /// audit sink around this path).
    pub fn preview(
        &self,
        rules: &[TransformationRule],
        group_id: &str,
        group_display_name: &str,
        entitlements: &HashMap<String, EntitlementMapping>,
    ) -> Result<PreviewResult, TransformError> {
        let outcome = self.transform_group(rules, group_id, group_display_name, entitlements)?;
        Ok(PreviewResult {
            matched_rule_id: outcome.matches.first().map(|m| m.rule_id.clone()),
            transformed_entitlement: outcome.resolved.first().cloned(),
            conflicts: outcome.conflict.into_iter().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::rule::RuleType;

    fn rule(id: &str, pattern: &str, target: &str, priority: i32, strategy: ConflictResolution) -> TransformationRule {
        TransformationRule::new(id, "tenant-a", "provider-a", RuleType::Exact, pattern, target)
            .with_priority(priority)
            .with_conflict_resolution(strategy)
    }

    #[test]
    fn test_single_match_no_conflict() {
        let engine = TransformationEngine::new();
        let rules = vec![rule("r1", "Sales Team", "Sales_Representative", 1, ConflictResolution::Union)];
        let outcome = engine
            .transform_group(&rules, "g1", "Sales Team", &HashMap::new())
            .unwrap();
        assert_eq!(outcome.resolved, vec!["Sales_Representative".to_string()]);
        assert!(outcome.conflict.is_none());
    }

    #[test]
    fn test_union_returns_all_matches() {
        let engine = TransformationEngine::new();
        let rules = vec![
            rule("r1", "Sales Team", "Role_A", 1, ConflictResolution::Union),
            rule("r2", "Sales Team", "Role_B", 2, ConflictResolution::Union),
        ];
        let outcome = engine
            .transform_group(&rules, "g1", "Sales Team", &HashMap::new())
            .unwrap();
        assert_eq!(outcome.resolved, vec!["Role_A".to_string(), "Role_B".to_string()]);
    }

    #[test]
    fn test_first_match_picks_highest_priority() {
        let engine = TransformationEngine::new();
        let rules = vec![
            rule("r1", "Sales Team", "Role_A", 2, ConflictResolution::FirstMatch),
            rule("r2", "Sales Team", "Role_B", 1, ConflictResolution::FirstMatch),
        ];
        let outcome = engine
            .transform_group(&rules, "g1", "Sales Team", &HashMap::new())
            .unwrap();
        assert_eq!(outcome.resolved, vec!["Role_B".to_string()]);
    }

    #[test]
    fn test_manual_review_returns_none_and_emits_conflict() {
        let engine = TransformationEngine::new();
        let rules = vec![
            rule("r1", "Sales Team", "Role_A", 1, ConflictResolution::ManualReview),
            rule("r2", "Sales Team", "Role_B", 2, ConflictResolution::ManualReview),
        ];
        let outcome = engine
            .transform_group(&rules, "g1", "Sales Team", &HashMap::new())
            .unwrap();
        assert!(outcome.resolved.is_empty());
        assert!(outcome.conflict.is_some());
        assert_eq!(
            outcome.conflict.unwrap().conflict_type,
            ConflictType::TransformationConflict
        );
    }

    #[test]
    fn test_error_strategy_fails_transformation() {
        let engine = TransformationEngine::new();
        let rules = vec![
            rule("r1", "Sales Team", "Role_A", 1, ConflictResolution::Error),
            rule("r2", "Sales Team", "Role_B", 2, ConflictResolution::Error),
        ];
        let err = engine
            .transform_group(&rules, "g1", "Sales Team", &HashMap::new())
            .unwrap_err();
        assert!(matches!(err, TransformError::ConflictError { .. }));
    }

    #[test]
    fn test_disabled_rules_excluded() {
        let engine = TransformationEngine::new();
        let mut disabled = rule("r1", "Sales Team", "Role_A", 1, ConflictResolution::Union);
        disabled.enabled = false;
        let outcome = engine
            .transform_group(&[disabled], "g1", "Sales Team", &HashMap::new())
            .unwrap();
        assert!(outcome.resolved.is_empty());
    }

    #[test]
    fn test_preview_does_not_mutate_and_reports_shape() {
        let engine = TransformationEngine::new();
        let rules = vec![rule("r1", "Sales Team", "Role_A", 1, ConflictResolution::Union)];
        let preview = engine
            .preview(&rules, "g1", "Sales Team", &HashMap::new())
            .unwrap();
        assert_eq!(preview.matched_rule_id, Some("r1".to_string()));
        assert_eq!(preview.transformed_entitlement, Some("Role_A".to_string()));
        assert!(preview.conflicts.is_empty());
    }
}
