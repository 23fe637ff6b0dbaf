//! Shared domain types.
//!
//! These types are kept small and serializable so an analysis can be:
//!
//! - computed in memory by the experiment pipelines
//! - printed as a results block
//! - exported to JSON next to the plots

use std::fmt;
use std::path::PathBuf;

use clap::ValueEnum;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// The lab experiments this tool knows how to evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ExperimentKind {
    /// V5 gas thermometer, heating phase: absolute zero from p(T).
    Heating,
    /// V5 specific heat of air: adiabatic exponent from Δp(ΔQ).
    SpecificHeat,
    /// V7 vapor pressure of water, cooling phase: ΔH from an Arrhenius fit.
    Vapor,
}

impl ExperimentKind {
    pub const ALL: [ExperimentKind; 3] = [
        ExperimentKind::Heating,
        ExperimentKind::SpecificHeat,
        ExperimentKind::Vapor,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            ExperimentKind::Heating => "Gas Thermometer (Heating)",
            ExperimentKind::SpecificHeat => "Specific Heat of Air",
            ExperimentKind::Vapor => "Vapor Pressure (Cooling)",
        }
    }

    /// CSV file name inside the data directory.
    pub fn data_file(self) -> &'static str {
        match self {
            ExperimentKind::Heating => "v5_heating.csv",
            ExperimentKind::SpecificHeat => "v5_specific_heat.csv",
            ExperimentKind::Vapor => "v7_cooling.csv",
        }
    }

    /// Plot file stem inside the output directory (extension depends on the format).
    pub fn plot_stem(self) -> &'static str {
        match self {
            ExperimentKind::Heating => "v5_gas_thermometer_heating",
            ExperimentKind::SpecificHeat => "v5_specific_heat",
            ExperimentKind::Vapor => "v7_vapor_pressure_cooling",
        }
    }

    /// Results file stem inside the output directory.
    pub fn results_stem(self) -> &'static str {
        match self {
            ExperimentKind::Heating => "results_gas_thermometer_heating",
            ExperimentKind::SpecificHeat => "results_specific_heat",
            ExperimentKind::Vapor => "results_vapor_pressure_cooling",
        }
    }
}

/// Image format for the rendered plot.
///
/// SVG is the vector option; Plotters has no PDF backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PlotFormat {
    Png,
    Svg,
}

impl PlotFormat {
    pub fn extension(self) -> &'static str {
        match self {
            PlotFormat::Png => "png",
            PlotFormat::Svg => "svg",
        }
    }
}

/// Resolved settings for one analysis run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Explicit CSV path. When `None`, `data_dir/<experiment data file>` is used.
    pub data_path: Option<PathBuf>,
    pub data_dir: PathBuf,
    pub out_dir: PathBuf,
    pub format: PlotFormat,
    pub plot: bool,
    /// Write `<results stem>.json` next to the results text file.
    pub export_json: bool,
    /// TrueType font for plot text.
    pub font: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            data_path: None,
            data_dir: PathBuf::from("data"),
            out_dir: PathBuf::from("plots"),
            format: PlotFormat::Png,
            plot: true,
            export_json: false,
            font: None,
        }
    }
}

impl RunConfig {
    pub fn data_path_for(&self, kind: ExperimentKind) -> PathBuf {
        self.data_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join(kind.data_file()))
    }

    pub fn plot_path_for(&self, kind: ExperimentKind) -> PathBuf {
        self.out_dir
            .join(format!("{}.{}", kind.plot_stem(), self.format.extension()))
    }

    pub fn results_path_for(&self, kind: ExperimentKind) -> PathBuf {
        self.out_dir.join(format!("{}.txt", kind.results_stem()))
    }

    pub fn json_path_for(&self, kind: ExperimentKind) -> PathBuf {
        self.out_dir.join(format!("{}.json", kind.results_stem()))
    }
}

/// A nominal value with its standard uncertainty.
///
/// `Display` honours the formatter precision for both parts, so
/// `format!("{:.2}", m)` gives `1.23+/-0.04`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measured {
    pub value: f64,
    pub sigma: f64,
}

impl Measured {
    pub fn new(value: f64, sigma: f64) -> Self {
        Self { value, sigma }
    }

    pub fn exact(value: f64) -> Self {
        Self { value, sigma: 0.0 }
    }

    /// Relative uncertainty `σ / |value|` (infinite for a zero value).
    pub fn relative(&self) -> f64 {
        if self.value == 0.0 {
            f64::INFINITY
        } else {
            self.sigma / self.value.abs()
        }
    }

    /// Distance to a reference value in units of this quantity's sigma.
    ///
    /// An exact quantity is `0` sigma away from an identical reference and
    /// infinitely far from any other.
    pub fn deviation_from(&self, reference: f64) -> f64 {
        let diff = (self.value - reference).abs();
        if diff == 0.0 {
            0.0
        } else if self.sigma == 0.0 {
            f64::INFINITY
        } else {
            diff / self.sigma
        }
    }
}

impl fmt::Display for Measured {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match f.precision() {
            Some(p) => write!(f, "{:.p$}+/-{:.p$}", self.value, self.sigma, p = p),
            None => write!(f, "{}+/-{}", self.value, self.sigma),
        }
    }
}

/// Regression-ready series of one experiment.
///
/// `sigma_x` may be present even when the fit only weights by `sigma_y`;
/// it is then only drawn as error bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitInput {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub sigma_x: Option<Vec<f64>>,
    pub sigma_y: Option<Vec<f64>>,
}

impl FitInput {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// How the straight line was fitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FitMethod {
    /// Unit weights, covariance scaled by the residual variance.
    Ordinary,
    /// Weights `1/σy²`, absolute-sigma covariance.
    Weighted,
    /// Weights `1/(σy² + m0²·σx²)` with `m0` from a `σy`-only seed fit.
    EffectiveVariance,
}

impl FitMethod {
    pub fn display_name(self) -> &'static str {
        match self {
            FitMethod::Ordinary => "ordinary least squares",
            FitMethod::Weighted => "weighted least squares",
            FitMethod::EffectiveVariance => "effective variance",
        }
    }
}

/// Straight-line fit `y = slope * x + intercept`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub method: FitMethod,
    pub slope: Measured,
    pub intercept: Measured,
    /// Parameter covariance in the order `[slope, intercept]`.
    pub covariance: [[f64; 2]; 2],
    pub chi2: f64,
    pub dof: usize,
    /// Per-point sigma the final pass was weighted with.
    pub sigma_used: Vec<f64>,
}

impl LinearFit {
    pub fn eval(&self, x: f64) -> f64 {
        self.slope.value * x + self.intercept.value
    }

    pub fn residuals(&self, x: &[f64], y: &[f64]) -> Vec<f64> {
        x.iter().zip(y).map(|(&xi, &yi)| yi - self.eval(xi)).collect()
    }

    pub fn covariance_matrix(&self) -> DMatrix<f64> {
        let c = &self.covariance;
        DMatrix::from_row_slice(2, 2, &[c[0][0], c[0][1], c[1][0], c[1][1]])
    }

    /// Pearson correlation between slope and intercept.
    pub fn correlation(&self) -> f64 {
        let denom = self.slope.sigma * self.intercept.sigma;
        if denom == 0.0 {
            0.0
        } else {
            self.covariance[0][1] / denom
        }
    }

    pub fn reduced_chi2(&self) -> Option<f64> {
        (self.dof > 0).then(|| self.chi2 / self.dof as f64)
    }
}

/// Reference value a derived constant is compared against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub label: String,
    pub value: f64,
    /// Report `|x - ref| / σ` (literature values) or only list the reference
    /// (expected values).
    pub show_deviation: bool,
}

/// A physical constant derived from the fit with propagated uncertainty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedConstant {
    pub label: String,
    pub value: Measured,
    pub unit: String,
    /// Decimal places used when printing.
    pub precision: usize,
    pub reference: Option<Reference>,
}

impl DerivedConstant {
    pub fn deviation(&self) -> Option<f64> {
        let reference = self.reference.as_ref()?;
        reference
            .show_deviation
            .then(|| self.value.deviation_from(reference.value))
    }
}

/// Labels and units for the printed fit parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamFormat {
    pub intercept_symbol: String,
    pub slope_unit: String,
    pub intercept_unit: String,
    pub precision: usize,
}

/// Corner of the chart the legend is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LegendCorner {
    UpperLeft,
    UpperRight,
}

/// Presentation of one analysis plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotSpec {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub data_label: String,
    pub fit_label: String,
    pub legend: LegendCorner,
    pub data_color: (u8, u8, u8),
    pub fit_color: (u8, u8, u8),
}

/// Complete outcome of one experiment run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub experiment: ExperimentKind,
    pub source: PathBuf,
    pub input: FitInput,
    pub fit: LinearFit,
    pub params: ParamFormat,
    pub derived: Vec<DerivedConstant>,
    pub plot: PlotSpec,
}

impl Analysis {
    pub fn residuals(&self) -> Vec<f64> {
        self.fit.residuals(&self.input.x, &self.input.y)
    }
}
