//! Change detector (§4.5): a stateless comparator between two resource
//! snapshots that produces [`DriftLogEntry`] records. The reconciler
//! (§4.6) consumes these to decide which drift gets auto-applied versus
//! routed to manual review.

pub mod detector;
pub mod types;

pub use detector::{content_hash, detect_drift};
pub use types::{DriftLogEntry, DriftType};
