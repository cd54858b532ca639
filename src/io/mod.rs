//! Input/output helpers.
//!
//! - catalog JSON loading + validation (`catalog`)
//! - table writers, file naming and the run manifest (`export`)

pub mod catalog;
pub mod export;

pub use catalog::*;
pub use export::*;
