//! Write analysis outputs: the results text block and the JSON export.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Local};
use log::info;
use serde::Serialize;

use crate::domain::Analysis;
use crate::error::AppError;

/// Create the output directory (and parents) if it does not exist yet.
pub fn ensure_output_dir(dir: &Path) -> Result<(), AppError> {
    if dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|e| {
        AppError::new(2, format!("Failed to create output directory '{}': {e}", dir.display()))
    })?;
    info!("Created directory: {}", dir.display());
    Ok(())
}

/// Write the results text, replacing any previous file.
pub fn write_results_text(path: &Path, text: &str) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create results file '{}': {e}", path.display())))?;
    file.write_all(text.as_bytes())
        .map_err(|e| AppError::new(2, format!("Failed to write results file '{}': {e}", path.display())))?;
    info!("Results saved to: {}", path.display());
    Ok(())
}

#[derive(Serialize)]
struct AnalysisExport<'a> {
    tool: &'static str,
    generated: DateTime<Local>,
    #[serde(flatten)]
    analysis: &'a Analysis,
    correlation: f64,
    reduced_chi2: Option<f64>,
}

/// Write the analysis as pretty-printed JSON.
pub fn write_analysis_json(path: &Path, analysis: &Analysis, generated: DateTime<Local>) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create JSON export '{}': {e}", path.display())))?;

    let export = AnalysisExport {
        tool: "labfit",
        generated,
        analysis,
        correlation: analysis.fit.correlation(),
        reduced_chi2: analysis.fit.reduced_chi2(),
    };

    serde_json::to_writer_pretty(file, &export)
        .map_err(|e| AppError::new(2, format!("Failed to write JSON export: {e}")))?;
    info!("JSON export saved to: {}", path.display());
    Ok(())
}
