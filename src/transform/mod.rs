//! Group → entitlement transformation engine (§4.4).
//!
//! Four rule flavors (`EXACT`, `REGEX`, `HIERARCHICAL`, `CONDITIONAL`,
//! [`rule`]), evaluated in priority order and collapsed to a final
//! entitlement set by one of five conflict strategies ([`engine`]). The
//! [`conflict`] module's [`ConflictLogEntry`] is shared with the
//! reconciler (§4.6), since both raise the same conflict-log entity.

pub mod conflict;
pub mod engine;
pub mod rule;

pub use conflict::{ConflictLogEntry, ConflictType, ResolutionAction};
pub use engine::{MatchedEntitlement, PreviewResult, TransformOutcome, TransformationEngine};
pub use rule::{ConditionalBranch, ConflictResolution, Predicate, RuleType, TransformationRule};
