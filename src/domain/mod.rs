//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - experiment and output selection (`ExperimentKind`, `PlotFormat`, `RunConfig`)
//! - values with uncertainty (`Measured`)
//! - fit inputs/outputs (`FitInput`, `LinearFit`) and derived results (`Analysis`)

pub mod types;

pub use types::*;
