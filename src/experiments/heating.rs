//! V5 gas thermometer, heating phase.
//!
//! A constant-volume gas thermometer is heated; pressure rises linearly with
//! temperature, `p = m T + b`. Extrapolating to `p = 0` gives the absolute
//! zero `T0 = -b / m` in °C.

use crate::domain::{
    Analysis, DerivedConstant, ExperimentKind, FitInput, LegendCorner, LinearFit, Measured, ParamFormat,
    PlotSpec, Reference,
};
use crate::error::AppError;
use crate::io::ingest::Table;
use crate::math::{fit_line, propagate};

pub const COL_TEMPERATURE: &str = "Temperatur (C)";
pub const COL_PRESSURE: &str = "Druck (hPa)";

/// Uncertainty in pressure (hPa).
pub const SIGMA_P: f64 = 5.0;
/// Uncertainty in temperature (°C). Only drawn; the fit weights by pressure.
pub const SIGMA_T: f64 = 1.0;

pub const ABSOLUTE_ZERO_LIT: f64 = -273.15;

pub fn prepare(table: &Table) -> Result<FitInput, AppError> {
    let t = table.column(COL_TEMPERATURE)?;
    let p = table.column(COL_PRESSURE)?;
    let n = t.len();
    Ok(FitInput {
        x: t,
        y: p,
        sigma_x: Some(vec![SIGMA_T; n]),
        sigma_y: Some(vec![SIGMA_P; n]),
    })
}

/// `T0 = -b / m` with `∂T0/∂m = b/m²` and `∂T0/∂b = -1/m`.
pub fn absolute_zero(fit: &LinearFit) -> Result<Measured, AppError> {
    let m = fit.slope.value;
    let b = fit.intercept.value;
    if m == 0.0 {
        return Err(AppError::new(
            4,
            "Fitted slope is zero; the pressure line never reaches p = 0.",
        ));
    }
    propagate(-b / m, &[b / (m * m), -1.0 / m], &fit.covariance_matrix())
}

pub fn analyze(table: &Table) -> Result<Analysis, AppError> {
    let input = prepare(table)?;
    let fit = fit_line(&input.x, &input.y, input.sigma_y.as_deref())?;
    let t0 = absolute_zero(&fit)?;

    Ok(Analysis {
        experiment: ExperimentKind::Heating,
        source: table.path.clone(),
        params: ParamFormat {
            intercept_symbol: "b".to_string(),
            slope_unit: "hPa/°C".to_string(),
            intercept_unit: "hPa".to_string(),
            precision: 4,
        },
        derived: vec![DerivedConstant {
            label: "Calculated Absolute Zero".to_string(),
            value: t0,
            unit: "°C".to_string(),
            precision: 2,
            reference: Some(Reference {
                label: "Literature Value".to_string(),
                value: ABSOLUTE_ZERO_LIT,
                show_deviation: true,
            }),
        }],
        plot: PlotSpec {
            title: "Gasthermometer Erwärmung: Druck gegen Temperatur".to_string(),
            x_label: "Temperatur [°C]".to_string(),
            y_label: "Druck [hPa]".to_string(),
            data_label: "Messdaten".to_string(),
            fit_label: format!("Fit: T₀ = {:.1} ± {:.1} °C", t0.value, t0.sigma),
            legend: LegendCorner::UpperLeft,
            data_color: (255, 165, 0),
            fit_color: (0, 128, 0),
        },
        input,
        fit,
    })
}
