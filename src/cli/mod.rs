//! Command-line parsing for the lab analysis tool.
//!
//! Parsing and conversion into [`RunConfig`] live here so the analysis code
//! never sees clap types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::data::SynthOptions;
use crate::domain::{ExperimentKind, PlotFormat, RunConfig};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "labfit",
    version,
    about = "Linear-regression analysis of physics lab measurements"
)]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Gas thermometer heating run: absolute zero from p(T).
    Heating(ExperimentArgs),
    /// Specific heat of air: adiabatic exponent from Δp(ΔQ).
    SpecificHeat(ExperimentArgs),
    /// Vapor pressure of water while cooling: enthalpy of vaporization.
    Vapor(ExperimentArgs),
    /// Run all three experiments from the data directory.
    All(OutputArgs),
    /// Write a synthetic dataset for an experiment.
    Simulate(SimulateArgs),
}

impl Command {
    /// Experiment named directly by the subcommand, if any.
    pub fn experiment(&self) -> Option<ExperimentKind> {
        match self {
            Command::Heating(_) => Some(ExperimentKind::Heating),
            Command::SpecificHeat(_) => Some(ExperimentKind::SpecificHeat),
            Command::Vapor(_) => Some(ExperimentKind::Vapor),
            Command::All(_) | Command::Simulate(_) => None,
        }
    }
}

/// Options for analysing a single experiment.
#[derive(Debug, Args, Clone)]
pub struct ExperimentArgs {
    /// CSV file to analyse (default: <data-dir>/<experiment file>).
    #[arg(long, value_name = "CSV")]
    pub data: Option<PathBuf>,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Input directory and output options shared by all analysis commands.
#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    /// Directory holding the default experiment CSV files.
    #[arg(long, value_name = "DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Directory for plots and results files.
    #[arg(long, value_name = "DIR", default_value = "plots")]
    pub out: PathBuf,

    /// Plot file format.
    #[arg(long, value_enum, default_value_t = PlotFormat::Png)]
    pub format: PlotFormat,

    /// TrueType font used for plot text.
    #[arg(long, value_name = "TTF", env = "LABFIT_FONT")]
    pub font: Option<PathBuf>,

    /// Also write the analysis as JSON next to the results text file.
    #[arg(long)]
    pub export_json: bool,

    /// Skip plot rendering.
    #[arg(long)]
    pub no_plot: bool,
}

/// Options for generating a synthetic dataset.
#[derive(Debug, Args, Clone)]
pub struct SimulateArgs {
    /// Experiment to simulate.
    #[arg(value_enum)]
    pub experiment: ExperimentKind,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Number of measurement rows.
    #[arg(long, default_value_t = 12)]
    pub points: usize,

    /// Write exact model values without noise.
    #[arg(long)]
    pub exact: bool,

    /// Output CSV (default: <data-dir>/<experiment file>).
    #[arg(long, short, value_name = "CSV")]
    pub output: Option<PathBuf>,

    /// Directory for the default output path.
    #[arg(long, value_name = "DIR", default_value = "data")]
    pub data_dir: PathBuf,
}

impl OutputArgs {
    pub fn to_config(&self, data_path: Option<PathBuf>) -> RunConfig {
        RunConfig {
            data_path,
            data_dir: self.data_dir.clone(),
            out_dir: self.out.clone(),
            format: self.format,
            plot: !self.no_plot,
            export_json: self.export_json,
            font: self.font.clone(),
        }
    }
}

impl ExperimentArgs {
    pub fn to_config(&self) -> RunConfig {
        self.output.to_config(self.data.clone())
    }
}

impl SimulateArgs {
    pub fn options(&self) -> SynthOptions {
        SynthOptions {
            points: self.points,
            seed: self.seed,
            noise: !self.exact,
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.data_dir.join(self.experiment.data_file()))
    }
}
