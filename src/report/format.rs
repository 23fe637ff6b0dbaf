//! Plain-text results block, as printed to the terminal and saved next to the plot.

use chrono::{DateTime, Local};

use crate::domain::{Analysis, Measured};

const RULE: &str = "------------------------------------------------------------";

/// Format the results block of one analysis.
///
/// The timestamp is passed in so output is reproducible in tests.
pub fn format_results(analysis: &Analysis, timestamp: DateTime<Local>) -> String {
    let fit = &analysis.fit;
    let params = &analysis.params;
    let p = params.precision;

    let mut out = String::new();
    out.push('\n');
    out.push_str(RULE);
    out.push('\n');
    out.push_str(&format!("Analysis Results: {}\n", analysis.experiment.display_name()));
    out.push_str(&format!("Date: {}\n", timestamp.format("%Y-%m-%d %H:%M")));
    out.push_str(&format!("File Analyzed: {}\n", analysis.source.display()));
    out.push_str(RULE);
    out.push('\n');

    out.push_str("Fit Parameters:\n");
    out.push_str(&format!("  Method:        {}\n", fit.method.display_name()));
    out.push_str(&format!(
        "  Slope (m):     {}\n",
        with_unit(&measured(fit.slope, p), &params.slope_unit)
    ));
    out.push_str(&format!(
        "  Intercept ({}): {}\n",
        params.intercept_symbol,
        with_unit(&measured(fit.intercept, p), &params.intercept_unit)
    ));
    if let Some(reduced) = fit.reduced_chi2() {
        out.push_str(&format!(
            "  chi2/dof:      {:.2}/{} = {:.3}\n",
            fit.chi2, fit.dof, reduced
        ));
    }

    out.push_str("\nPhysics Results:\n");
    let width = label_width(analysis);
    for (i, constant) in analysis.derived.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let prec = constant.precision;
        out.push_str(&format!(
            "  {:<width$}{}\n",
            format!("{}:", constant.label),
            with_unit(&measured(constant.value, prec), &constant.unit),
        ));
        if let Some(reference) = &constant.reference {
            out.push_str(&format!(
                "  {:<width$}{}\n",
                format!("{}:", reference.label),
                with_unit(&format!("{:.prec$}", reference.value), &constant.unit),
            ));
        }
        if let Some(deviation) = constant.deviation() {
            out.push_str(&format!("  {:<width$}{deviation:.1} sigma\n", "Deviation:"));
        }
    }
    out.push_str(RULE);
    out.push('\n');

    out
}

fn measured(m: Measured, precision: usize) -> String {
    format!("{:.precision$} +/- {:.precision$}", m.value, m.sigma)
}

fn with_unit(value: &str, unit: &str) -> String {
    if unit.is_empty() {
        value.to_string()
    } else {
        format!("{value} {unit}")
    }
}

/// Column where physics values start: longest label plus `": "`.
fn label_width(analysis: &Analysis) -> usize {
    analysis
        .derived
        .iter()
        .flat_map(|c| {
            std::iter::once(c.label.chars().count())
                .chain(c.reference.iter().map(|r| r.label.chars().count()))
        })
        .chain(std::iter::once("Deviation".len()))
        .max()
        .unwrap_or(0)
        + 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synth::{SynthOptions, synthetic_csv};
    use crate::domain::ExperimentKind;
    use crate::io::ingest::parse_table;
    use chrono::TimeZone;
    use std::path::Path;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 17, 14, 3, 0).unwrap()
    }

    fn analysis(kind: ExperimentKind) -> Analysis {
        let csv = synthetic_csv(kind, &SynthOptions::default()).unwrap();
        let path = Path::new("data").join(kind.data_file());
        let table = parse_table(&path, &csv).unwrap();
        crate::experiments::analyze(kind, &table).unwrap()
    }

    #[test]
    fn heating_block_has_header_params_and_deviation() {
        let text = format_results(&analysis(ExperimentKind::Heating), fixed_time());

        assert!(text.contains("Analysis Results: Gas Thermometer (Heating)\n"));
        assert!(text.contains("Date: 2024-05-17 14:03\n"));
        let source = Path::new("data").join("v5_heating.csv");
        assert!(text.contains(&format!("File Analyzed: {}\n", source.display())));
        assert!(text.contains("  Slope (m):     "));
        assert!(text.contains(" hPa/°C\n"));
        assert!(text.contains("  Intercept (b): "));
        assert!(text.contains("  Calculated Absolute Zero: "));
        assert!(text.contains("  Literature Value:         -273.15 °C\n"));
        assert!(text.contains("  Deviation:                "));
        assert!(text.trim_end().ends_with(RULE));
        assert_eq!(text.matches(RULE).count(), 3);
    }

    #[test]
    fn expected_value_is_listed_without_deviation() {
        let text = format_results(&analysis(ExperimentKind::SpecificHeat), fixed_time());

        assert!(text.contains("Adiabatic Exponent (kappa): "));
        assert!(text.contains("Literature Value (Air):     1.4000\n"));
        assert!(text.contains("Expected Value (Diatomic):  5.000\n"));
        // Only kappa is compared against its literature value.
        assert_eq!(text.matches("Deviation:").count(), 1);
    }

    #[test]
    fn empty_units_leave_no_trailing_space() {
        let text = format_results(&analysis(ExperimentKind::Vapor), fixed_time());
        let intercept = text
            .lines()
            .find(|l| l.starts_with("  Intercept (c): "))
            .unwrap();
        assert_eq!(intercept, intercept.trim_end());
        assert!(text.contains(" kJ/mol\n"));
        assert!(text.contains("Literature Value (100°C): 40.66 kJ/mol\n"));
    }

    #[test]
    fn measured_uses_shared_precision() {
        assert_eq!(measured(Measured::new(1.23456, 0.0456), 2), "1.23 +/- 0.05");
        assert_eq!(with_unit("1.0", ""), "1.0");
        assert_eq!(with_unit("1.0", "K"), "1.0 K");
    }
}
