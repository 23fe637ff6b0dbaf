//! Top-level application orchestration.
//!
//! `src/main.rs` only maps the result to an exit code; this module:
//! - loads `.env` and parses CLI arguments
//! - sets up logging from the verbosity flag
//! - runs one or all experiment pipelines and prints their results
//! - generates synthetic datasets

use clap::Parser;
use log::{debug, info};

use crate::cli::{Cli, Command, SimulateArgs};
use crate::domain::{ExperimentKind, RunConfig};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `labfit` binary.
pub fn run() -> Result<(), AppError> {
    // `.env` may provide LABFIT_FONT, so it has to be loaded before parsing.
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();
    init_logging(cli.verbose);
    if let Ok(path) = dotenv {
        debug!("Loaded environment from {}", path.display());
    }

    let kind = cli.command.experiment();
    match cli.command {
        Command::Heating(args) | Command::SpecificHeat(args) | Command::Vapor(args) => {
            let kind = kind.ok_or_else(|| AppError::new(2, "No experiment selected."))?;
            handle_experiment(kind, &args.to_config())
        }
        Command::All(args) => {
            let config = args.to_config(None);
            for kind in ExperimentKind::ALL {
                handle_experiment(kind, &config)?;
            }
            Ok(())
        }
        Command::Simulate(args) => handle_simulate(&args),
    }
}

fn init_logging(verbose: u8) {
    env_logger::Builder::new()
        .filter_level(match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();
}

fn handle_experiment(kind: ExperimentKind, config: &RunConfig) -> Result<(), AppError> {
    let run = pipeline::run_experiment(kind, config)?;

    println!("{}", run.results_text);
    println!("Results saved to: {}", run.results_path.display());
    if let Some(path) = &run.json_path {
        println!("JSON export saved to: {}", path.display());
    }
    if let Some(path) = &run.plot_path {
        println!("Plot saved successfully to: {}", path.display());
    }
    info!(
        "{}: {} ({} points, chi2/dof = {:.3})",
        kind.display_name(),
        run.analysis.fit.method.display_name(),
        run.analysis.input.len(),
        run.analysis.fit.reduced_chi2().unwrap_or(f64::NAN)
    );
    Ok(())
}

fn handle_simulate(args: &SimulateArgs) -> Result<(), AppError> {
    let path = args.output_path();
    crate::data::write_synthetic_csv(&path, args.experiment, &args.options())?;
    println!("Synthetic data written to: {}", path.display());
    Ok(())
}
