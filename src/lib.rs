//! `labfit` library crate.
//!
//! The binary (`labfit`) is a thin wrapper around this library so that:
//!
//! - fits, propagation and report formatting are testable without processes
//! - each experiment is a small module on top of shared regression code

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod experiments;
pub mod io;
pub mod math;
pub mod plot;
pub mod report;
