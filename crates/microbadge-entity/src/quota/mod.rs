//! Granter quota entities.

pub mod model;
pub mod period;
pub mod scope;

pub use model::{QuotaDefinition, QuotaUsage};
pub use period::PeriodType;
pub use scope::{QuotaScope, ScopeType};
