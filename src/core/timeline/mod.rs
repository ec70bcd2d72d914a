//! Timeline Module
//!
//! Defines the timeline composition model: tracks of time-positioned
//! elements, plus the validated atomic operations that edit commands wrap.

mod models;
mod ops;

pub use models::*;
pub use ops::*;
