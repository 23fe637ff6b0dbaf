//! Reporting: the results text block of an analysis.

pub mod format;

pub use format::format_results;
