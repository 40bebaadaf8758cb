//! Intake event entities.

pub mod model;

pub use model::{Attributes, Event, NewEvent};
