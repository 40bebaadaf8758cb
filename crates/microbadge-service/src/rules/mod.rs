//! Rule evaluation: conditions, cooldowns and the per-event matcher.

pub mod condition;
pub mod cooldown;
pub mod matcher;

pub use condition::{ConditionError, evaluate, evaluate_event, parse_metric};
pub use cooldown::{CooldownChecker, within_cooldown};
pub use matcher::{EventReport, RuleMatch, RuleMatcher, RuleTestResult};
