//! Command Module
//!
//! Reversible edit commands against the timeline, plus the executor that
//! owns undo/redo history and transactions.

mod caption;
mod element;
mod executor;
mod track;
mod traits;

pub use caption::*;
pub use element::*;
pub use executor::*;
pub use track::*;
pub use traits::*;
