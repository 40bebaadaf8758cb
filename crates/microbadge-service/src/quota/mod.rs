//! Per-granter quota ledger.

pub mod ledger;
pub mod period;

pub use ledger::{QuotaCheck, QuotaLedger, QuotaSummaryItem};
pub use period::{local_date, period_key};
