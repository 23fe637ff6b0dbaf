//! V5 specific heat of air.
//!
//! A capacitor discharged through a heating wire deposits `ΔQ = ½ C U²` into
//! a closed air volume; the pressure rise is read from a water manometer,
//! `Δp = ρ g Δh`. For an adiabatic step `Δp = (κ - 1) / V · ΔQ`, so the fitted
//! slope gives `κ = m V + 1` and the degrees of freedom `f = 2 / (κ - 1)`.

use crate::domain::{
    Analysis, DerivedConstant, ExperimentKind, FitInput, LegendCorner, LinearFit, Measured, ParamFormat,
    PlotSpec, Reference,
};
use crate::error::AppError;
use crate::io::ingest::Table;
use crate::math::{fit_line, propagate, with_independent};

pub const COL_VOLTAGE: &str = "Spannung (V)";
pub const COL_HEIGHT: &str = "Delta_H (mm)";

/// Uncertainty in voltage (V).
pub const SIGMA_U: f64 = 3.0;
/// Uncertainty in manometer height (mm).
pub const SIGMA_H: f64 = 0.5;

/// Capacitance (F).
pub const CAPACITANCE: f64 = 20e-6;
/// Density of water (kg/m³).
pub const RHO_WATER: f64 = 1000.0;
/// Gravitational acceleration (m/s²).
pub const G: f64 = 9.81;
/// Gas volume (m³) and its uncertainty.
pub const VOLUME: Measured = Measured {
    value: 3.2e-3,
    sigma: 0.000129,
};

pub const KAPPA_AIR: f64 = 1.40;
pub const DOF_DIATOMIC: f64 = 5.0;

/// Electrical energy `ΔQ = ½ C U²` with `σQ = C U σU`.
pub fn heating_energy(voltage: f64) -> Measured {
    Measured::new(
        0.5 * CAPACITANCE * voltage * voltage,
        CAPACITANCE * voltage.abs() * SIGMA_U,
    )
}

/// Hydrostatic pressure `Δp = ρ g h` for a height in mm.
pub fn manometer_pressure(height_mm: f64) -> Measured {
    Measured::new(
        RHO_WATER * G * (height_mm / 1000.0),
        RHO_WATER * G * (SIGMA_H / 1000.0),
    )
}

pub fn prepare(table: &Table) -> Result<FitInput, AppError> {
    let voltage = table.column(COL_VOLTAGE)?;
    let height = table.column(COL_HEIGHT)?;

    let (x, sigma_x): (Vec<f64>, Vec<f64>) = voltage
        .iter()
        .map(|&u| {
            let q = heating_energy(u);
            (q.value, q.sigma)
        })
        .unzip();
    let (y, sigma_y): (Vec<f64>, Vec<f64>) = height
        .iter()
        .map(|&h| {
            let p = manometer_pressure(h);
            (p.value, p.sigma)
        })
        .unzip();

    Ok(FitInput {
        x,
        y,
        sigma_x: Some(sigma_x),
        sigma_y: Some(sigma_y),
    })
}

/// Slope/intercept covariance extended by the independent volume uncertainty.
///
/// Variable order: `[m, b, V]`.
fn covariance_with_volume(fit: &LinearFit, volume: Measured) -> nalgebra::DMatrix<f64> {
    with_independent(&fit.covariance_matrix(), &[volume.sigma])
}

/// `κ = m V + 1` with `∂κ/∂m = V`, `∂κ/∂V = m`.
pub fn adiabatic_exponent(fit: &LinearFit, volume: Measured) -> Result<Measured, AppError> {
    let m = fit.slope.value;
    let v = volume.value;
    propagate(m * v + 1.0, &[v, 0.0, m], &covariance_with_volume(fit, volume))
}

/// `f = 2 / (κ - 1) = 2 / (m V)`.
pub fn degrees_of_freedom(fit: &LinearFit, volume: Measured) -> Result<Measured, AppError> {
    let m = fit.slope.value;
    let v = volume.value;
    if m * v == 0.0 {
        return Err(AppError::new(
            4,
            "κ - 1 is zero; degrees of freedom are undefined.",
        ));
    }
    propagate(
        2.0 / (m * v),
        &[-2.0 / (m * m * v), 0.0, -2.0 / (m * v * v)],
        &covariance_with_volume(fit, volume),
    )
}

pub fn analyze(table: &Table) -> Result<Analysis, AppError> {
    let input = prepare(table)?;
    let fit = fit_line(&input.x, &input.y, input.sigma_y.as_deref())?;
    let kappa = adiabatic_exponent(&fit, VOLUME)?;
    let dof = degrees_of_freedom(&fit, VOLUME)?;

    Ok(Analysis {
        experiment: ExperimentKind::SpecificHeat,
        source: table.path.clone(),
        params: ParamFormat {
            intercept_symbol: "b".to_string(),
            slope_unit: "Pa/J".to_string(),
            intercept_unit: "Pa".to_string(),
            precision: 2,
        },
        derived: vec![
            DerivedConstant {
                label: "Adiabatic Exponent (kappa)".to_string(),
                value: kappa,
                unit: String::new(),
                precision: 4,
                reference: Some(Reference {
                    label: "Literature Value (Air)".to_string(),
                    value: KAPPA_AIR,
                    show_deviation: true,
                }),
            },
            DerivedConstant {
                label: "Degrees of Freedom (f)".to_string(),
                value: dof,
                unit: String::new(),
                precision: 3,
                reference: Some(Reference {
                    label: "Expected Value (Diatomic)".to_string(),
                    value: DOF_DIATOMIC,
                    show_deviation: false,
                }),
            },
        ],
        plot: PlotSpec {
            title: "Spezifische Wärme: Druckanstieg vs. Heizenergie".to_string(),
            x_label: "Elektrische Energie ΔQ [J]".to_string(),
            y_label: "Druckänderung Δp [Pa]".to_string(),
            data_label: "Messdaten".to_string(),
            fit_label: format!("Linear Fit: κ = {:.2} ± {:.2}", kappa.value, kappa.sigma),
            legend: LegendCorner::UpperLeft,
            data_color: (0, 128, 128),
            fit_color: (139, 0, 0),
        },
        input,
        fit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synth::{SynthOptions, synthetic_csv};
    use crate::domain::FitMethod;
    use crate::io::ingest::parse_table;
    use std::path::Path;

    fn fit_with_slope(m: f64, sigma_m: f64) -> LinearFit {
        LinearFit {
            method: FitMethod::Weighted,
            slope: Measured::new(m, sigma_m),
            intercept: Measured::exact(0.0),
            covariance: [[sigma_m * sigma_m, 0.0], [0.0, 0.0]],
            chi2: 0.0,
            dof: 3,
            sigma_used: vec![],
        }
    }

    #[test]
    fn conversions_follow_lab_formulas() {
        let q = heating_energy(200.0);
        assert!((q.value - 0.4).abs() < 1e-12);
        assert!((q.sigma - 0.012).abs() < 1e-12);

        let p = manometer_pressure(10.0);
        assert!((p.value - 98.1).abs() < 1e-9);
        assert!((p.sigma - 4.905).abs() < 1e-9);
    }

    #[test]
    fn noise_free_data_recovers_kappa_of_air() {
        let csv = synthetic_csv(
            ExperimentKind::SpecificHeat,
            &SynthOptions {
                noise: false,
                ..SynthOptions::default()
            },
        )
        .unwrap();
        let table = parse_table(Path::new("specific_heat.csv"), &csv).unwrap();
        let analysis = analyze(&table).unwrap();

        let kappa = analysis.derived[0].value;
        let f = analysis.derived[1].value;
        assert!((kappa.value - KAPPA_AIR).abs() < 1e-9, "{kappa}");
        assert!((f.value - 5.0).abs() < 1e-6, "{f}");
        assert!(analysis.derived[1].deviation().is_none());
        assert!(analysis.derived[0].deviation().unwrap() < 1e-3);
    }

    #[test]
    fn kappa_sigma_is_linear_in_volume_sigma_with_exact_slope() {
        let fit = fit_with_slope(125.0, 0.0);
        for sigma_v in [1e-5, 2e-5, 4e-5] {
            let kappa = adiabatic_exponent(&fit, Measured::new(3.2e-3, sigma_v)).unwrap();
            assert!((kappa.sigma - 125.0 * sigma_v).abs() < 1e-12);
        }
    }

    #[test]
    fn kappa_sigma_is_linear_in_slope_sigma_with_exact_volume() {
        for sigma_m in [1.0, 2.0, 4.0] {
            let fit = fit_with_slope(125.0, sigma_m);
            let kappa = adiabatic_exponent(&fit, Measured::exact(3.2e-3)).unwrap();
            assert!((kappa.sigma - 3.2e-3 * sigma_m).abs() < 1e-12);
        }
    }

    #[test]
    fn degrees_of_freedom_matches_relative_error_of_kappa_minus_one() {
        // f = 2/(mV): relative errors of m and V add in quadrature.
        let fit = fit_with_slope(125.0, 5.0);
        let f = degrees_of_freedom(&fit, VOLUME).unwrap();
        let rel = ((5.0_f64 / 125.0).powi(2) + (VOLUME.sigma / VOLUME.value).powi(2)).sqrt();
        assert!((f.value - 5.0).abs() < 1e-9);
        assert!((f.relative() - rel).abs() < 1e-12);
    }

    #[test]
    fn zero_slope_has_undefined_degrees_of_freedom() {
        let fit = fit_with_slope(0.0, 1.0);
        assert_eq!(degrees_of_freedom(&fit, VOLUME).unwrap_err().exit_code(), 4);
    }
}
