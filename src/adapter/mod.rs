//! Adapter abstraction & registry (§4.1).
//!
//! Every downstream provider integration implements [`Adapter`], the
//! fixed capability surface the core dispatches against; the
//! [`AdapterRegistry`] owns live instances keyed by `providerId` and
//! enforces tenant ACLs and administrative disable/enable.

pub mod capabilities;
pub mod entitlement;
pub mod filter;
pub mod mock;
pub mod registry;
pub mod traits;

pub use capabilities::{Capabilities, FilterOp, ALL_FILTER_OPS};
pub use entitlement::{EntitlementMapping, EntitlementType};
pub use filter::{evaluate as evaluate_filter, parse_filter, FilterError, FilterExpr, FilterValue};
pub use mock::MockAdapter;
pub use registry::{AdapterRegistry, RefreshError};
pub use traits::{Adapter, HealthStatus};
