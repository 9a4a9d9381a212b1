//! Reconciler (§4.6): three-way compare between last-known, upstream, and
//! provider state, followed by a directional apply gated by the
//! configured strategy. Dual modifications, delete/modify conflicts, and
//! create-collision uniqueness violations are forced to `MANUAL_REVIEW`
//! regardless of the configured strategy.

pub mod engine;
pub mod types;

pub use engine::{classify, Reconciler};
pub use types::{
    ChangedSide, Direction, ReconcileOutcome, ReconcileStrategy, SyncSettings, ThreeWayClassification,
};
