//! Core type definitions used across the MicroBadge workspace.

pub mod id;

pub use id::*;
