//! Asset Management Module
//!
//! Holds media asset models and the registry that loads them through the
//! external decode collaborator.

mod models;
mod registry;

pub use models::*;
pub use registry::*;
