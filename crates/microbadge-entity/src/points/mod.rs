//! Point ledger entities.

pub mod model;

pub use model::{NewPointTransaction, PointTransaction, PointType};
