//! Analysis figure: data with error bars, fit line, residual panel.
//!
//! Drawing is generic over the Plotters backend so the same code renders the
//! PNG and the SVG variant. All series and bounds are computed up front in
//! [`FigureData`]; the draw functions only draw.

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::domain::{Analysis, LegendCorner};
use crate::plot::PlotError;
use crate::plot::fonts::FONT_FAMILY;

/// Samples along the fitted line.
const FIT_SAMPLES: usize = 100;
/// Share of the figure height used by the main chart.
const MAIN_PANEL_SHARE: f64 = 0.72;
/// Relative padding around the data bounds.
const PAD_FRAC: f64 = 0.05;

const ERROR_BAR_COLOR: RGBColor = RGBColor(128, 128, 128);
const GRID_COLOR: RGBColor = RGBColor(225, 225, 225);

/// Everything the figure needs, precomputed from an analysis.
#[derive(Debug, Clone)]
pub struct FigureData {
    /// `(x, y, σx, σy)` per point.
    pub points: Vec<(f64, f64, f64, f64)>,
    pub fit_line: Vec<(f64, f64)>,
    /// `(x, residual, σ used by the fit)` per point.
    pub residuals: Vec<(f64, f64, f64)>,
    pub x_bounds: (f64, f64),
    pub y_bounds: (f64, f64),
    pub residual_bounds: (f64, f64),
}

impl FigureData {
    pub fn from_analysis(analysis: &Analysis) -> Result<Self, PlotError> {
        let input = &analysis.input;
        if input.is_empty() {
            return Err(PlotError::EmptyData);
        }

        let n = input.len();
        let sigma_x = input.sigma_x.clone().unwrap_or_else(|| vec![0.0; n]);
        let sigma_y = input.sigma_y.clone().unwrap_or_else(|| vec![0.0; n]);
        let points: Vec<(f64, f64, f64, f64)> = (0..n)
            .map(|i| (input.x[i], input.y[i], sigma_x[i], sigma_y[i]))
            .collect();

        let (x_min, x_max) = min_max(input.x.iter().copied()).ok_or(PlotError::EmptyData)?;
        let fit_line: Vec<(f64, f64)> = (0..FIT_SAMPLES)
            .map(|i| {
                let x = x_min + (x_max - x_min) * i as f64 / (FIT_SAMPLES - 1) as f64;
                (x, analysis.fit.eval(x))
            })
            .collect();

        let residuals: Vec<(f64, f64, f64)> = analysis
            .residuals()
            .into_iter()
            .zip(&input.x)
            .zip(&analysis.fit.sigma_used)
            .map(|((r, &x), &s)| (x, r, s))
            .collect();

        let x_bounds = pad(
            min_max(points.iter().flat_map(|&(x, _, sx, _)| [x - sx, x + sx])).ok_or(PlotError::EmptyData)?,
        );
        let y_bounds = pad(
            min_max(
                points
                    .iter()
                    .flat_map(|&(_, y, _, sy)| [y - sy, y + sy])
                    .chain(fit_line.iter().map(|&(_, y)| y)),
            )
            .ok_or(PlotError::EmptyData)?,
        );
        // Residual axis is symmetric around zero.
        let r_max = residuals
            .iter()
            .map(|&(_, r, s)| r.abs() + s)
            .fold(0.0_f64, f64::max);
        let residual_bounds = pad((-r_max, r_max));

        Ok(Self {
            points,
            fit_line,
            residuals,
            x_bounds,
            y_bounds,
            residual_bounds,
        })
    }
}

/// Draw the whole figure onto a root drawing area.
pub fn draw_figure<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    analysis: &Analysis,
    data: &FigureData,
    with_text: bool,
) -> Result<(), PlotError> {
    root.fill(&WHITE).map_err(PlotError::drawing)?;

    let (_, height) = root.dim_in_pixel();
    let split = (height as f64 * MAIN_PANEL_SHARE) as u32;
    let (upper, lower) = root.split_vertically(split);

    draw_main_panel(&upper, analysis, data, with_text)?;
    draw_residual_panel(&lower, analysis, data, with_text)?;

    root.present().map_err(PlotError::drawing)?;
    Ok(())
}

fn draw_main_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    analysis: &Analysis,
    data: &FigureData,
    with_text: bool,
) -> Result<(), PlotError> {
    let spec = &analysis.plot;
    let data_color = rgb(spec.data_color);
    let fit_color = rgb(spec.fit_color);

    let mut builder = ChartBuilder::on(area);
    builder
        .margin(24)
        .x_label_area_size(if with_text { 60 } else { 10 })
        .y_label_area_size(if with_text { 100 } else { 10 });
    if with_text {
        builder.caption(&spec.title, (FONT_FAMILY, 34).into_font());
    }
    let mut chart = builder
        .build_cartesian_2d(data.x_bounds.0..data.x_bounds.1, data.y_bounds.0..data.y_bounds.1)
        .map_err(PlotError::drawing)?;

    let mut mesh = chart.configure_mesh();
    mesh.light_line_style(&GRID_COLOR).bold_line_style(&GRID_COLOR);
    if with_text {
        mesh.x_desc(spec.x_label.as_str())
            .y_desc(spec.y_label.as_str())
            .x_labels(8)
            .y_labels(8)
            .label_style((FONT_FAMILY, 20).into_font())
            .axis_desc_style((FONT_FAMILY, 24).into_font());
    } else {
        mesh.x_labels(0).y_labels(0);
    }
    mesh.draw().map_err(PlotError::drawing)?;

    // Error bars first so the markers sit on top.
    chart
        .draw_series(data.points.iter().filter(|p| p.3 > 0.0).map(|&(x, y, _, sy)| {
            ErrorBar::new_vertical(x, y - sy, y, y + sy, ERROR_BAR_COLOR.filled(), 8)
        }))
        .map_err(PlotError::drawing)?;
    chart
        .draw_series(data.points.iter().filter(|p| p.2 > 0.0).map(|&(x, y, sx, _)| {
            ErrorBar::new_horizontal(y, x - sx, x, x + sx, ERROR_BAR_COLOR.filled(), 8)
        }))
        .map_err(PlotError::drawing)?;

    let markers = chart
        .draw_series(
            data.points
                .iter()
                .map(|&(x, y, _, _)| Circle::new((x, y), 6, data_color.filled())),
        )
        .map_err(PlotError::drawing)?;
    if with_text {
        markers
            .label(spec.data_label.as_str())
            .legend(move |(x, y)| Circle::new((x + 10, y), 6, data_color.filled()));
    }

    let line = chart
        .draw_series(LineSeries::new(data.fit_line.iter().copied(), fit_color.stroke_width(3)))
        .map_err(PlotError::drawing)?;
    if with_text {
        line.label(spec.fit_label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], fit_color.stroke_width(3)));

        let position = match spec.legend {
            LegendCorner::UpperLeft => SeriesLabelPosition::UpperLeft,
            LegendCorner::UpperRight => SeriesLabelPosition::UpperRight,
        };
        chart
            .configure_series_labels()
            .position(position)
            .background_style(&WHITE.mix(0.85))
            .border_style(&BLACK)
            .label_font((FONT_FAMILY, 22).into_font())
            .draw()
            .map_err(PlotError::drawing)?;
    }

    Ok(())
}

fn draw_residual_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    analysis: &Analysis,
    data: &FigureData,
    with_text: bool,
) -> Result<(), PlotError> {
    let data_color = rgb(analysis.plot.data_color);

    let mut chart = ChartBuilder::on(area)
        .margin(24)
        .x_label_area_size(if with_text { 60 } else { 10 })
        .y_label_area_size(if with_text { 100 } else { 10 })
        .build_cartesian_2d(
            data.x_bounds.0..data.x_bounds.1,
            data.residual_bounds.0..data.residual_bounds.1,
        )
        .map_err(PlotError::drawing)?;

    let mut mesh = chart.configure_mesh();
    mesh.light_line_style(&GRID_COLOR).bold_line_style(&GRID_COLOR);
    if with_text {
        mesh.x_desc(analysis.plot.x_label.as_str())
            .y_desc("Residuum")
            .x_labels(8)
            .y_labels(5)
            .label_style((FONT_FAMILY, 20).into_font())
            .axis_desc_style((FONT_FAMILY, 24).into_font());
    } else {
        mesh.x_labels(0).y_labels(0);
    }
    mesh.draw().map_err(PlotError::drawing)?;

    chart
        .draw_series(LineSeries::new(
            [(data.x_bounds.0, 0.0), (data.x_bounds.1, 0.0)],
            BLACK.stroke_width(1),
        ))
        .map_err(PlotError::drawing)?;
    chart
        .draw_series(data.residuals.iter().filter(|r| r.2 > 0.0).map(|&(x, r, s)| {
            ErrorBar::new_vertical(x, r - s, r, r + s, ERROR_BAR_COLOR.filled(), 8)
        }))
        .map_err(PlotError::drawing)?;
    chart
        .draw_series(
            data.residuals
                .iter()
                .map(|&(x, r, _)| Circle::new((x, r), 5, data_color.filled())),
        )
        .map_err(PlotError::drawing)?;

    Ok(())
}

fn rgb((r, g, b): (u8, u8, u8)) -> RGBColor {
    RGBColor(r, g, b)
}

fn min_max(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    (lo <= hi).then_some((lo, hi))
}

/// Pad a range by `PAD_FRAC`, widening degenerate ranges.
fn pad((lo, hi): (f64, f64)) -> (f64, f64) {
    let span = hi - lo;
    if span <= f64::EPSILON * lo.abs().max(hi.abs()).max(1.0) {
        let half = (lo.abs() * 0.05).max(1.0);
        return (lo - half, hi + half);
    }
    (lo - span * PAD_FRAC, hi + span * PAD_FRAC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synth::{SynthOptions, synthetic_csv};
    use crate::domain::ExperimentKind;
    use crate::io::ingest::parse_table;
    use std::path::Path;

    fn analysis(kind: ExperimentKind) -> Analysis {
        let csv = synthetic_csv(kind, &SynthOptions::default()).unwrap();
        let table = parse_table(Path::new("synth.csv"), &csv).unwrap();
        crate::experiments::analyze(kind, &table).unwrap()
    }

    #[test]
    fn figure_bounds_contain_error_bars_and_fit() {
        let a = analysis(ExperimentKind::Heating);
        let fig = FigureData::from_analysis(&a).unwrap();

        assert_eq!(fig.fit_line.len(), FIT_SAMPLES);
        assert_eq!(fig.residuals.len(), a.input.len());
        for &(x, y, sx, sy) in &fig.points {
            assert!(x - sx >= fig.x_bounds.0 && x + sx <= fig.x_bounds.1);
            assert!(y - sy >= fig.y_bounds.0 && y + sy <= fig.y_bounds.1);
        }
        for &(_, y) in &fig.fit_line {
            assert!(y >= fig.y_bounds.0 && y <= fig.y_bounds.1);
        }
        assert!((fig.residual_bounds.0 + fig.residual_bounds.1).abs() < 1e-12);
    }

    #[test]
    fn fit_line_spans_the_measured_x_range() {
        let a = analysis(ExperimentKind::Vapor);
        let fig = FigureData::from_analysis(&a).unwrap();
        let (lo, hi) = min_max(a.input.x.iter().copied()).unwrap();
        assert_eq!(fig.fit_line.first().unwrap().0, lo);
        assert!((fig.fit_line.last().unwrap().0 - hi).abs() < 1e-15);
    }

    #[test]
    fn degenerate_range_is_widened() {
        let (lo, hi) = pad((5.0, 5.0));
        assert!(lo < 5.0 && hi > 5.0);
        let (lo, hi) = pad((0.0, 10.0));
        assert!((lo + 0.5).abs() < 1e-12 && (hi - 10.5).abs() < 1e-12);
    }
}
