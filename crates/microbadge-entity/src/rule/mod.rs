//! Automatic grant rule entities.

pub mod condition;
pub mod model;

pub use condition::{Condition, LeafCondition};
pub use model::{Rule, RuleAction};
