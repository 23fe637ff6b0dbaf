//! Input/output helpers.
//!
//! - CSV ingest (`ingest`)
//! - results text and JSON exports (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
