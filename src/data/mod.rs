//! Dataset generation.

pub mod synth;

pub use synth::{SynthOptions, synthetic_csv, write_synthetic_csv};
