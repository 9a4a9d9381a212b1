//! Capability advertisement for adapters (§4.1 supplement).
//!
//! An adapter publishes a [`Capabilities`] value describing its page-size
//! ceiling, PATCH support, and the subset of the SCIM filter operator set
//! it honors. The registry and the polling service clamp caller requests
//! to `max_page_size`; `list` rejects operators outside
//! `supported_filter_ops` with `InvalidFilter` (§4.1).

use std::collections::HashSet;

/// The SCIM filter operator set the core recognizes (§4.1, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOp {
    Eq,
    Ne,
    Co,
    Sw,
    Ew,
    Pr,
    Gt,
    Ge,
    Lt,
    Le,
    And,
    Or,
    Not,
}

/// All operators in the supported set, in the order spec.md §4.1 lists them.
pub const ALL_FILTER_OPS: [FilterOp; 13] = [
    FilterOp::Eq,
    FilterOp::Ne,
    FilterOp::Co,
    FilterOp::Sw,
    FilterOp::Ew,
    FilterOp::Pr,
    FilterOp::Gt,
    FilterOp::Ge,
    FilterOp::Lt,
    FilterOp::Le,
    FilterOp::And,
    FilterOp::Or,
    FilterOp::Not,
];

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Ne => "ne",
            FilterOp::Co => "co",
            FilterOp::Sw => "sw",
            FilterOp::Ew => "ew",
            FilterOp::Pr => "pr",
            FilterOp::Gt => "gt",
            FilterOp::Ge => "ge",
            FilterOp::Lt => "lt",
            FilterOp::Le => "le",
            FilterOp::And => "and",
            FilterOp::Or => "or",
            FilterOp::Not => "not",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        let lower = token.to_ascii_lowercase();
        ALL_FILTER_OPS.into_iter().find(|op| op.as_str() == lower)
    }

    /// Whether this is a comparison operator (takes a left-hand attribute
    /// and, except `pr`, a right-hand value) as opposed to a boolean
    /// combinator (`and`/`or`/`not`).
    pub fn is_comparison(&self) -> bool {
        !matches!(self, FilterOp::And | FilterOp::Or | FilterOp::Not)
    }
}

/// The capability surface an adapter advertises (§4.1 supplement).
#[derive(Debug, Clone)]
pub struct Capabilities {
    /// The largest page size the adapter will serve in one `list` call.
    pub max_page_size: usize,
    /// Whether the adapter supports partial (PATCH) updates.
    pub supports_patch: bool,
    /// The filter operators this adapter's `list` implementation honors.
    pub supported_filter_ops: HashSet<FilterOp>,
}

impl Capabilities {
    /// The full operator set, `supports_patch = true`, given page size.
    pub fn new(max_page_size: usize) -> Self {
        Self {
            max_page_size,
            supports_patch: true,
            supported_filter_ops: ALL_FILTER_OPS.into_iter().collect(),
        }
    }

    pub fn supports_op(&self, op: FilterOp) -> bool {
        self.supported_filter_ops.contains(&op)
    }

    /// Clamp a caller-requested page size to this adapter's ceiling.
    pub fn clamp_count(&self, requested: usize) -> usize {
        requested.min(self.max_page_size)
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        for op in ALL_FILTER_OPS {
            assert_eq!(FilterOp::parse(op.as_str()), Some(op));
        }
    }

    #[test]
    fn test_unknown_operator_rejected() {
        assert_eq!(FilterOp::parse("xx"), None);
    }

    #[test]
    fn test_clamp_count() {
        let caps = Capabilities::new(50);
        assert_eq!(caps.clamp_count(200), 50);
        assert_eq!(caps.clamp_count(10), 10);
    }
}
