//! User-badge grant entities.

pub mod model;
pub mod request;
pub mod status;

pub use model::{Grant, NewGrant};
pub use request::GrantRequest;
pub use status::GrantStatus;
