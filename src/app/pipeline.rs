//! The analysis pipeline shared by every experiment command.
//!
//! load CSV -> prepare + fit + derive -> results text -> (JSON) -> plot
//!
//! The input is read and analysed, and the plot font checked, before anything
//! is written, so a missing or malformed file never leaves partial output
//! behind.

use std::path::PathBuf;

use chrono::{DateTime, Local};
use log::info;

use crate::domain::{Analysis, ExperimentKind, RunConfig};
use crate::error::AppError;
use crate::io::export::{ensure_output_dir, write_analysis_json, write_results_text};
use crate::io::ingest::load_table;

/// Everything a single experiment run produced.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub analysis: Analysis,
    pub results_text: String,
    pub results_path: PathBuf,
    pub json_path: Option<PathBuf>,
    pub plot_path: Option<PathBuf>,
}

/// Analyse one experiment and write its outputs.
pub fn run_experiment(kind: ExperimentKind, config: &RunConfig) -> Result<RunOutput, AppError> {
    run_experiment_at(kind, config, Local::now())
}

/// Same as [`run_experiment`] with a fixed report timestamp.
pub fn run_experiment_at(
    kind: ExperimentKind,
    config: &RunConfig,
    timestamp: DateTime<Local>,
) -> Result<RunOutput, AppError> {
    let data_path = config.data_path_for(kind);
    info!("{}: analysing {}", kind.display_name(), data_path.display());

    let table = load_table(&data_path)?;
    let analysis = crate::experiments::analyze(kind, &table)?;
    if config.plot {
        crate::plot::ensure_font(config.font.as_deref())?;
    }

    ensure_output_dir(&config.out_dir)?;

    let results_text = crate::report::format_results(&analysis, timestamp);
    let results_path = config.results_path_for(kind);
    write_results_text(&results_path, &results_text)?;

    let json_path = if config.export_json {
        let path = config.json_path_for(kind);
        write_analysis_json(&path, &analysis, timestamp)?;
        Some(path)
    } else {
        None
    };

    let plot_path = if config.plot {
        let path = config.plot_path_for(kind);
        crate::plot::render_analysis(&analysis, &path, config.format, config.font.as_deref())?;
        Some(path)
    } else {
        None
    };

    Ok(RunOutput {
        analysis,
        results_text,
        results_path,
        json_path,
        plot_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synth::{SynthOptions, write_synthetic_csv};
    use chrono::TimeZone;

    fn config_in(dir: &std::path::Path) -> RunConfig {
        RunConfig {
            data_dir: dir.join("data"),
            out_dir: dir.join("plots"),
            plot: false,
            ..RunConfig::default()
        }
    }

    #[test]
    fn missing_csv_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        let err = run_experiment(ExperimentKind::Heating, &config).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(!config.out_dir.exists());
    }

    #[test]
    fn malformed_csv_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        std::fs::create_dir_all(&config.data_dir).unwrap();
        std::fs::write(
            config.data_path_for(ExperimentKind::Vapor),
            "Druck (Bar),Ohmzahl (Ohm)\n0.9,abc\n",
        )
        .unwrap();

        let err = run_experiment(ExperimentKind::Vapor, &config).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(!config.out_dir.exists());
    }

    #[test]
    fn unreadable_font_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig {
            plot: true,
            font: Some(dir.path().join("missing.ttf")),
            ..config_in(dir.path())
        };
        write_synthetic_csv(
            &config.data_path_for(ExperimentKind::Heating),
            ExperimentKind::Heating,
            &SynthOptions::default(),
        )
        .unwrap();

        let err = run_experiment(ExperimentKind::Heating, &config).unwrap_err();
        assert_eq!(err.exit_code(), 5);
        assert!(err.message().contains("missing.ttf"));
        assert!(!config.out_dir.exists());
    }

    #[test]
    fn synthetic_runs_write_results_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig {
            export_json: true,
            ..config_in(dir.path())
        };
        let at = Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 0).unwrap();

        for kind in ExperimentKind::ALL {
            write_synthetic_csv(&config.data_path_for(kind), kind, &SynthOptions::default()).unwrap();
            let run = run_experiment_at(kind, &config, at).unwrap();

            let saved = std::fs::read_to_string(&run.results_path).unwrap();
            assert_eq!(saved, run.results_text);
            assert!(saved.contains("Date: 2024-01-02 03:04"));
            assert!(run.plot_path.is_none());

            let json_path = run.json_path.unwrap();
            let value: serde_json::Value =
                serde_json::from_str(&std::fs::read_to_string(json_path).unwrap()).unwrap();
            assert_eq!(value["tool"], "labfit");
        }
    }

    #[test]
    fn heating_recovers_absolute_zero_from_exact_data() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let opts = SynthOptions {
            noise: false,
            ..SynthOptions::default()
        };
        write_synthetic_csv(&config.data_path_for(ExperimentKind::Heating), ExperimentKind::Heating, &opts)
            .unwrap();

        let run = run_experiment(ExperimentKind::Heating, &config).unwrap();
        let t0 = run.analysis.derived[0].value;
        assert!((t0.value + 273.15).abs() < 1e-6, "{}", t0.value);
        assert!(t0.sigma > 0.0);
    }
}
