//! Publication plots of an analysis (PNG or SVG).

use std::path::Path;

use log::info;
use plotters::prelude::*;
use thiserror::Error;

use crate::domain::{Analysis, PlotFormat};

mod chart;
mod fonts;

pub use chart::FigureData;
pub use fonts::ensure_font;

/// Figure size in pixels (8x6 in at 200 dpi).
pub const FIGURE_SIZE: (u32, u32) = (1600, 1200);

#[derive(Debug, Error)]
pub enum PlotError {
    #[error("font error: {0}")]
    Font(String),
    #[error("drawing error: {0}")]
    Drawing(String),
    #[error("no data points to plot")]
    EmptyData,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PlotError {
    fn drawing(err: impl std::fmt::Display) -> Self {
        PlotError::Drawing(err.to_string())
    }
}

/// Render the data, fit line, legend and residual panel to `path`.
pub fn render_analysis(
    analysis: &Analysis,
    path: &Path,
    format: PlotFormat,
    font: Option<&Path>,
) -> Result<(), PlotError> {
    let with_text = fonts::ensure_font(font)?;
    let data = FigureData::from_analysis(analysis)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    match format {
        PlotFormat::Png => {
            let root = BitMapBackend::new(path, FIGURE_SIZE).into_drawing_area();
            chart::draw_figure(&root, analysis, &data, with_text)?;
        }
        PlotFormat::Svg => {
            let root = SVGBackend::new(path, FIGURE_SIZE).into_drawing_area();
            chart::draw_figure(&root, analysis, &data, with_text)?;
        }
    }

    info!("Plot saved to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synth::{SynthOptions, synthetic_csv};
    use crate::domain::ExperimentKind;
    use crate::io::ingest::parse_table;

    #[test]
    fn renders_svg_and_png_files() {
        let csv = synthetic_csv(ExperimentKind::SpecificHeat, &SynthOptions::default()).unwrap();
        let table = parse_table(Path::new("synth.csv"), &csv).unwrap();
        let analysis = crate::experiments::analyze(ExperimentKind::SpecificHeat, &table).unwrap();

        let dir = tempfile::tempdir().unwrap();
        for format in [PlotFormat::Svg, PlotFormat::Png] {
            let path = dir.path().join(format!("figure.{}", format.extension()));
            render_analysis(&analysis, &path, format, None).unwrap();
            let meta = std::fs::metadata(&path).unwrap();
            assert!(meta.len() > 0);
        }
    }
}
