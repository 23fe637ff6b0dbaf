//! Numerical core: weighted least squares, line fits, error propagation.

pub mod ols;
pub mod propagate;
pub mod regression;

pub use ols::*;
pub use propagate::*;
pub use regression::*;
