//! Organization directory entities.

pub mod model;
pub mod tree;

pub use model::Organization;
pub use tree::OrgForest;
