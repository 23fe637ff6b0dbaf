//! Synthetic lab datasets.
//!
//! Each generator follows the textbook physics of its experiment, optionally
//! perturbed by seeded Gaussian noise of the size the lab instruments have.
//! Output uses the exact column layout the experiment ingests, so a generated
//! file can be analysed like a real measurement.

use std::fs;
use std::path::Path;

use log::info;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::ExperimentKind;
use crate::error::AppError;
use crate::experiments::{columns, heating, specific_heat, vapor};

/// Gas pressure in the thermometer bulb at 0 °C (hPa).
const HEATING_P0_HPA: f64 = 1013.25;
const HEATING_T_RANGE: (f64, f64) = (20.0, 90.0);

const SPECIFIC_HEAT_U_RANGE: (f64, f64) = (100.0, 400.0);

/// Cooling run from near boiling down to 45 °C.
const VAPOR_T_RANGE: (f64, f64) = (95.0, 45.0);
/// Vapor pressure of water at its normal boiling point (bar, K).
const VAPOR_P_REF_BAR: f64 = 1.01325;
const VAPOR_T_REF_K: f64 = 373.15;
/// Thermometer jitter used for synthetic readings (°C).
const VAPOR_T_NOISE: f64 = 0.3;

#[derive(Debug, Clone)]
pub struct SynthOptions {
    pub points: usize,
    pub seed: u64,
    /// When `false`, values lie exactly on the model and are written at full precision.
    pub noise: bool,
}

impl Default for SynthOptions {
    fn default() -> Self {
        Self {
            points: 12,
            seed: 42,
            noise: true,
        }
    }
}

/// Generate a synthetic CSV (header + rows) for an experiment.
pub fn synthetic_csv(kind: ExperimentKind, opts: &SynthOptions) -> Result<String, AppError> {
    if opts.points < 2 {
        return Err(AppError::new(2, "A synthetic dataset needs at least 2 points."));
    }

    let mut rng = StdRng::seed_from_u64(opts.seed);
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;
    let mut noise = |scale: f64| {
        if opts.noise {
            scale * normal.sample(&mut rng)
        } else {
            0.0
        }
    };

    let mut rows: Vec<[String; 2]> = Vec::with_capacity(opts.points);
    for i in 0..opts.points {
        let u = i as f64 / (opts.points - 1) as f64;
        let row = match kind {
            ExperimentKind::Heating => {
                let t = lerp(HEATING_T_RANGE, u);
                let p = HEATING_P0_HPA * (1.0 - t / heating::ABSOLUTE_ZERO_LIT);
                [
                    reading(t + noise(heating::SIGMA_T), 1, opts.noise),
                    reading(p + noise(heating::SIGMA_P), 1, opts.noise),
                ]
            }
            ExperimentKind::SpecificHeat => {
                let voltage = lerp(SPECIFIC_HEAT_U_RANGE, u);
                let q = specific_heat::heating_energy(voltage).value;
                let dp = (specific_heat::KAPPA_AIR - 1.0) / specific_heat::VOLUME.value * q;
                let h_mm = dp / (specific_heat::RHO_WATER * specific_heat::G) * 1000.0;
                [
                    reading(voltage + noise(specific_heat::SIGMA_U), 0, opts.noise),
                    reading(h_mm + noise(specific_heat::SIGMA_H), 1, opts.noise),
                ]
            }
            ExperimentKind::Vapor => {
                let t = lerp(VAPOR_T_RANGE, u);
                let t_k = t + vapor::ZERO_CELSIUS_K;
                let slope = -vapor::LIT_VAL_100C * 1000.0 / vapor::R_GAS;
                let p = VAPOR_P_REF_BAR * (slope * (1.0 / t_k - 1.0 / VAPOR_T_REF_K)).exp();
                let r = vapor::temperature_to_resistance(t + noise(VAPOR_T_NOISE));
                [
                    reading(p * (1.0 + noise(vapor::SIGMA_P_REL)), 3, opts.noise),
                    reading(r, 1, opts.noise),
                ]
            }
        };
        rows.push(row);
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(columns(kind))
        .map_err(|e| AppError::new(2, format!("Failed to write CSV header: {e}")))?;
    for row in &rows {
        writer
            .write_record(row)
            .map_err(|e| AppError::new(2, format!("Failed to write CSV row: {e}")))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::new(2, format!("Failed to flush CSV: {e}")))?;
    String::from_utf8(bytes).map_err(|e| AppError::new(2, format!("Generated CSV is not UTF-8: {e}")))
}

/// Generate and write a synthetic dataset, creating parent directories.
pub fn write_synthetic_csv(path: &Path, kind: ExperimentKind, opts: &SynthOptions) -> Result<(), AppError> {
    let csv = synthetic_csv(kind, opts)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", parent.display())))?;
    }
    fs::write(path, csv)
        .map_err(|e| AppError::new(2, format!("Failed to write '{}': {e}", path.display())))?;
    info!(
        "Wrote {} synthetic {} rows to {} (seed {})",
        opts.points,
        kind.display_name(),
        path.display(),
        opts.seed
    );
    Ok(())
}

fn lerp((a, b): (f64, f64), u: f64) -> f64 {
    a + u * (b - a)
}

/// Noisy values are rounded like an instrument reading; exact values keep
/// full round-trip precision.
fn reading(v: f64, decimals: usize, rounded: bool) -> String {
    if rounded {
        format!("{v:.decimals$}")
    } else {
        format!("{v}")
    }
}
