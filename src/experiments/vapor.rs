//! V7 vapor pressure of water, cooling phase.
//!
//! Temperature is read from a Pt1000 resistance thermometer, pressure from a
//! manometer in bar. Clausius–Clapeyron gives a straight Arrhenius line
//! `ln p = -ΔH / R · 1/T + c`, fitted with effective variance because both
//! axes carry uncertainty.

use crate::domain::{
    Analysis, DerivedConstant, ExperimentKind, FitInput, LegendCorner, LinearFit, Measured, ParamFormat,
    PlotSpec, Reference,
};
use crate::error::AppError;
use crate::io::ingest::Table;
use crate::math::{fit_effective_variance, propagate};

pub const COL_PRESSURE: &str = "Druck (Bar)";
pub const COL_RESISTANCE: &str = "Ohmzahl (Ohm)";

/// Universal gas constant (J / (mol K)).
pub const R_GAS: f64 = 8.31446;
/// Enthalpy of vaporization of water at 100 °C (kJ/mol).
pub const LIT_VAL_100C: f64 = 40.66;

pub const ZERO_CELSIUS_K: f64 = 273.15;

// Callendar–Van Dusen coefficients for a Pt1000 above 0 °C.
pub const PT_A: f64 = 3.9083e-3;
pub const PT_B: f64 = -5.775e-7;
pub const PT_R0: f64 = 1000.0;

/// Relative pressure uncertainty.
pub const SIGMA_P_REL: f64 = 0.01;

/// Invert `R = R0 (1 + A T + B T²)` for the temperature in °C.
pub fn resistance_to_temperature(r_ohm: f64) -> Result<f64, AppError> {
    let discriminant = PT_A * PT_A - 4.0 * PT_B * (1.0 - r_ohm / PT_R0);
    if !(discriminant >= 0.0) {
        return Err(AppError::new(
            4,
            format!("Resistance {r_ohm} Ω is outside the Pt1000 range."),
        ));
    }
    Ok((-PT_A + discriminant.sqrt()) / (2.0 * PT_B))
}

/// `R = R0 (1 + A T + B T²)` for a temperature in °C.
pub fn temperature_to_resistance(t_celsius: f64) -> f64 {
    PT_R0 * (1.0 + PT_A * t_celsius + PT_B * t_celsius * t_celsius)
}

/// Thermometer uncertainty (°C): reading resolution of 1 Ω at ~3.85 Ω/K
/// combined with the class B tolerance `0.3 + 0.005 T`.
pub fn temperature_sigma(t_celsius: f64) -> f64 {
    ((1.0 / 3.85_f64).powi(2) + (0.3 + 0.005 * t_celsius).powi(2)).sqrt()
}

pub fn prepare(table: &Table) -> Result<FitInput, AppError> {
    let pressure = table.column(COL_PRESSURE)?;
    let resistance = table.column(COL_RESISTANCE)?;

    let n = pressure.len();
    let mut input = FitInput {
        x: Vec::with_capacity(n),
        y: Vec::with_capacity(n),
        sigma_x: Some(Vec::with_capacity(n)),
        sigma_y: Some(Vec::with_capacity(n)),
    };

    for (&p_bar, &r_ohm) in pressure.iter().zip(&resistance) {
        if p_bar <= 0.0 {
            return Err(AppError::new(
                4,
                format!("Pressure must be positive for ln(p), got {p_bar} bar."),
            ));
        }
        let t_celsius = resistance_to_temperature(r_ohm)?;
        let t_kelvin = t_celsius + ZERO_CELSIUS_K;
        if t_kelvin <= 0.0 {
            return Err(AppError::new(
                4,
                format!("Resistance {r_ohm} Ω maps below absolute zero."),
            ));
        }

        let sigma_t = temperature_sigma(t_celsius);
        let sigma_p = SIGMA_P_REL * p_bar;

        input.x.push(1.0 / t_kelvin);
        input.y.push(p_bar.ln());
        if let Some(sx) = input.sigma_x.as_mut() {
            sx.push(sigma_t / (t_kelvin * t_kelvin));
        }
        if let Some(sy) = input.sigma_y.as_mut() {
            sy.push(sigma_p / p_bar);
        }
    }

    Ok(input)
}

/// `ΔH = -m R` converted to kJ/mol.
pub fn vaporization_enthalpy(fit: &LinearFit) -> Result<Measured, AppError> {
    let scale = -R_GAS / 1000.0;
    propagate(fit.slope.value * scale, &[scale, 0.0], &fit.covariance_matrix())
}

pub fn analyze(table: &Table) -> Result<Analysis, AppError> {
    let input = prepare(table)?;
    let sigma_x = input.sigma_x.as_deref().unwrap_or_default();
    let sigma_y = input.sigma_y.as_deref().unwrap_or_default();
    let fit = fit_effective_variance(&input.x, &input.y, sigma_x, sigma_y)?;
    let delta_h = vaporization_enthalpy(&fit)?;

    Ok(Analysis {
        experiment: ExperimentKind::Vapor,
        source: table.path.clone(),
        params: ParamFormat {
            intercept_symbol: "c".to_string(),
            slope_unit: "K".to_string(),
            intercept_unit: String::new(),
            precision: 4,
        },
        derived: vec![DerivedConstant {
            label: "Enthalpy of Vaporization".to_string(),
            value: delta_h,
            unit: "kJ/mol".to_string(),
            precision: 2,
            reference: Some(Reference {
                label: "Literature Value (100°C)".to_string(),
                value: LIT_VAL_100C,
                show_deviation: true,
            }),
        }],
        plot: PlotSpec {
            title: "Arrheniusplot Abkühlung: ln(p) vs 1/T".to_string(),
            x_label: "Reziproke Temperatur 1/T [K⁻¹]".to_string(),
            y_label: "Log-Druck ln(p / 1 bar)".to_string(),
            data_label: "Messdaten".to_string(),
            fit_label: format!("Fit: ΔH = {:.2} ± {:.2} kJ/mol", delta_h.value, delta_h.sigma),
            legend: LegendCorner::UpperRight,
            data_color: (0, 0, 255),
            fit_color: (0, 190, 210),
        },
        input,
        fit,
    })
}
