//! Transformation rule model and per-rule evaluation (§4.4).

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::TransformError;

/// The four rule flavors (§4.4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "ruleType")]
pub enum RuleType {
    /// Case-sensitive string equality against `sourcePattern`.
    Exact,
    /// `sourcePattern` is an anchored regex; `targetMapping` expands
    /// `${0}` (full match) and `${N}` (Nth capture).
    Regex,
    /// The display name is split on `delimiter` into ordered levels;
    /// `targetMapping` references `${level0}…${levelN}`.
    Hierarchical { delimiter: String },
    /// Multiple predicate/output branches evaluated in order, first-true
    /// wins; `default_value` is used when no branch matches.
    Conditional {
        branches: Vec<ConditionalBranch>,
        default_value: Option<String>,
    },
}

/// A single branch of a `CONDITIONAL` rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalBranch {
    pub predicate: Predicate,
    pub true_value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    Substring(String),
    Regex(String),
}

impl Predicate {
    fn matches(&self, display_name: &str) -> Result<bool, TransformError> {
        match self {
            Predicate::Substring(needle) => Ok(display_name.contains(needle.as_str())),
            Predicate::Regex(pattern) => {
                let re = Regex::new(pattern).map_err(|e| TransformError::InvalidPattern {
                    rule_id: pattern.clone(),
                    message: e.to_string(),
                })?;
                Ok(re.is_match(display_name))
            }
        }
    }
}

/// Conflict-resolution strategies applied to a matched set with
/// `|matches| > 1` (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictResolution {
    Union,
    FirstMatch,
    HighestPrivilege,
    ManualReview,
    Error,
}

/// `{id, tenantId, providerId, ruleType, sourcePattern, targetMapping,
/// priority(lower=higher), enabled, conflictResolution}` (§3, §4.4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformationRule {
    pub id: String,
    pub tenant_id: String,
    pub provider_id: String,
    pub rule_type: RuleType,
    pub source_pattern: String,
    pub target_mapping: String,
    pub priority: i32,
    pub enabled: bool,
    pub conflict_resolution: ConflictResolution,
}

impl TransformationRule {
    pub fn new(
        id: impl Into<String>,
        tenant_id: impl Into<String>,
        provider_id: impl Into<String>,
        rule_type: RuleType,
        source_pattern: impl Into<String>,
        target_mapping: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            tenant_id: tenant_id.into(),
            provider_id: provider_id.into(),
            rule_type,
            source_pattern: source_pattern.into(),
            target_mapping: target_mapping.into(),
            priority: 0,
            enabled: true,
            conflict_resolution: ConflictResolution::Union,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_conflict_resolution(mut self, strategy: ConflictResolution) -> Self {
        self.conflict_resolution = strategy;
        self
    }

    /// Evaluate this rule against a group's display name. `Ok(None)` means
    /// the rule does not match this input — including the boundary cases
    /// of an out-of-range regex capture or hierarchy level (§8) — which is
    /// distinct from `Err`, reserved for a malformed rule (invalid regex).
    pub fn evaluate(&self, display_name: &str) -> Result<Option<String>, TransformError> {
        match &self.rule_type {
            RuleType::Exact => {
                if display_name == self.source_pattern {
                    Ok(Some(self.target_mapping.clone()))
                } else {
                    Ok(None)
                }
            }
            RuleType::Regex => self.evaluate_regex(display_name),
            RuleType::Hierarchical { delimiter } => self.evaluate_hierarchical(display_name, delimiter),
            RuleType::Conditional { branches, default_value } => {
                self.evaluate_conditional(display_name, branches, default_value)
            }
        }
    }

    fn evaluate_regex(&self, display_name: &str) -> Result<Option<String>, TransformError> {
        let re = Regex::new(&self.source_pattern).map_err(|e| TransformError::InvalidPattern {
            rule_id: self.id.clone(),
            message: e.to_string(),
        })?;
        let Some(captures) = re.captures(display_name) else {
            return Ok(None);
        };

        let mut result = String::new();
        let mut chars = self.target_mapping.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next();
                let mut digits = String::new();
                for d in chars.by_ref() {
                    if d == '}' {
                        break;
                    }
                    digits.push(d);
                }
                let Ok(index) = digits.parse::<usize>() else {
                    return Ok(None);
                };
                let Some(value) = captures.get(index) else {
                    // ${N} with no Nth capture in this match: does not match (§8).
                    return Ok(None);
                };
                result.push_str(value.as_str());
            } else {
                result.push(c);
            }
        }
        Ok(Some(result))
    }

    fn evaluate_hierarchical(&self, display_name: &str, delimiter: &str) -> Result<Option<String>, TransformError> {
        let levels: Vec<&str> = display_name.split(delimiter).collect();

        let mut result = String::new();
        let mut chars = self.target_mapping.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next();
                let mut token = String::new();
                for d in chars.by_ref() {
                    if d == '}' {
                        break;
                    }
                    token.push(d);
                }
                let Some(digits) = token.strip_prefix("level") else {
                    return Ok(None);
                };
                let Ok(index) = digits.parse::<usize>() else {
                    return Ok(None);
                };
                let Some(value) = levels.get(index) else {
                    // template references a level beyond the split: does not match (§8).
                    return Ok(None);
                };
                result.push_str(value);
            } else {
                result.push(c);
            }
        }
        Ok(Some(result))
    }

    fn evaluate_conditional(
        &self,
        display_name: &str,
        branches: &[ConditionalBranch],
        default_value: &Option<String>,
    ) -> Result<Option<String>, TransformError> {
        for branch in branches {
            if branch.predicate.matches(display_name)? {
                return Ok(Some(branch.true_value.clone()));
            }
        }
        Ok(default_value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_scenario() {
        let rule = TransformationRule::new(
            "r1",
            "t1",
            "p1",
            RuleType::Exact,
            "Sales Team",
            "Sales_Representative",
        );
        assert_eq!(rule.evaluate("Sales Team").unwrap(), Some("Sales_Representative".to_string()));
        assert_eq!(rule.evaluate("sales team").unwrap(), None);
    }

    #[test]
    fn test_regex_scenario() {
        let rule = TransformationRule::new(
            "r2",
            "t1",
            "p1",
            RuleType::Regex,
            "^Sales-(.*)$",
            "Sales_${1}_Rep",
        );
        assert_eq!(rule.evaluate("Sales-EMEA").unwrap(), Some("Sales_EMEA_Rep".to_string()));
        assert_eq!(rule.evaluate("Marketing-EMEA").unwrap(), None);
    }

    #[test]
    fn test_regex_missing_capture_does_not_match() {
        let rule = TransformationRule::new(
            "r3",
            "t1",
            "p1",
            RuleType::Regex,
            "^Sales-(.*)$",
            "Sales_${2}_Rep",
        );
        assert_eq!(rule.evaluate("Sales-EMEA").unwrap(), None);
    }

    #[test]
    fn test_hierarchical_scenario() {
        let rule = TransformationRule::new(
            "r4",
            "t1",
            "p1",
            RuleType::Hierarchical { delimiter: "/".to_string() },
            "",
            "ORG-${level2}",
        );
        assert_eq!(
            rule.evaluate("Acme Corp/Sales/EMEA/Field Sales").unwrap(),
            Some("ORG-EMEA".to_string())
        );
        assert_eq!(rule.evaluate("Acme Corp/Marketing").unwrap(), None);
    }

    #[test]
    fn test_conditional_first_true_wins() {
        let rule = TransformationRule::new(
            "r5",
            "t1",
            "p1",
            RuleType::Conditional {
                branches: vec![
                    ConditionalBranch {
                        predicate: Predicate::Substring("Sales".to_string()),
                        true_value: "Sales_Role".to_string(),
                    },
                    ConditionalBranch {
                        predicate: Predicate::Substring("Marketing".to_string()),
                        true_value: "Marketing_Role".to_string(),
                    },
                ],
                default_value: Some("Default_Role".to_string()),
            },
            "",
            "",
        );
        assert_eq!(rule.evaluate("Sales-EMEA").unwrap(), Some("Sales_Role".to_string()));
        assert_eq!(rule.evaluate("Ops").unwrap(), Some("Default_Role".to_string()));
    }
}
