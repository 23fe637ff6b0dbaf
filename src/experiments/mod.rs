//! The individual lab experiments.
//!
//! Each experiment owns its literal constants and turns a loaded table into
//! an [`Analysis`]:
//!
//! 1. `prepare`: columns -> `(x, y, σx, σy)` with propagated uncertainties
//! 2. fit a straight line (weighted or effective variance)
//! 3. derive the physical constants from the fit covariance

use crate::domain::{Analysis, ExperimentKind};
use crate::error::AppError;
use crate::io::ingest::Table;

pub mod heating;
pub mod specific_heat;
pub mod vapor;

/// Column headers an experiment expects, in CSV order.
pub fn columns(kind: ExperimentKind) -> [&'static str; 2] {
    match kind {
        ExperimentKind::Heating => [heating::COL_TEMPERATURE, heating::COL_PRESSURE],
        ExperimentKind::SpecificHeat => [specific_heat::COL_VOLTAGE, specific_heat::COL_HEIGHT],
        ExperimentKind::Vapor => [vapor::COL_PRESSURE, vapor::COL_RESISTANCE],
    }
}

/// Run the fit and derivation for one experiment.
pub fn analyze(kind: ExperimentKind, table: &Table) -> Result<Analysis, AppError> {
    match kind {
        ExperimentKind::Heating => heating::analyze(table),
        ExperimentKind::SpecificHeat => specific_heat::analyze(table),
        ExperimentKind::Vapor => vapor::analyze(table),
    }
}
