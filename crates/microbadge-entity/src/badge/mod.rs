//! Badge catalog entities.

pub mod model;

pub use model::BadgeDefinition;
