//! PNG plots of a comparison: the profiles of all compared methods on one chart
//! and their absolute errors with respect to the reference.
use crate::numerical::Analysis::analyzer::ComparisonReport;
use crate::numerical::solver_errors::{CorneaError, CorneaResult};
use log::info;
use plotters::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

pub const PROFILES_PNG: &str = "method_comparison.png";
pub const ERRORS_PNG: &str = "error_analysis.png";

type Series = (String, Vec<(f64, f64)>);

fn plot_err<E: std::fmt::Display>(e: E) -> CorneaError {
    CorneaError::Plot(e.to_string())
}

/// axis range of all series with 5% padding; degenerate ranges are widened
pub fn padded_range(series: &[Series]) -> Option<((f64, f64), (f64, f64))> {
    let points = series.iter().flat_map(|(_, s)| s.iter());
    let (mut x0, mut x1, mut y0, mut y1) = (
        f64::INFINITY,
        f64::NEG_INFINITY,
        f64::INFINITY,
        f64::NEG_INFINITY,
    );
    for &(x, y) in points {
        if !(x.is_finite() && y.is_finite()) {
            continue;
        }
        x0 = x0.min(x);
        x1 = x1.max(x);
        y0 = y0.min(y);
        y1 = y1.max(y);
    }
    if x0 > x1 {
        return None;
    }
    let pad = |lo: f64, hi: f64| {
        let span = hi - lo;
        if span > 0.0 {
            (lo - 0.05 * span, hi + 0.05 * span)
        } else {
            let w = lo.abs().max(1.0) * 0.05;
            (lo - w, hi + w)
        }
    };
    Some((pad(x0, x1), pad(y0, y1)))
}

fn line_chart(path: &Path, caption: &str, y_desc: &str, series: &[Series]) -> CorneaResult<()> {
    let ((x0, x1), (y0, y1)) = padded_range(series)
        .ok_or_else(|| CorneaError::Plot(format!("nothing to draw in {}", caption)))?;
    let root_area = BitMapBackend::new(path, (1000, 700)).into_drawing_area();
    root_area.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root_area)
        .caption(caption, ("sans-serif", 36))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(x0..x1, y0..y1)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("x")
        .y_desc(y_desc)
        .draw()
        .map_err(plot_err)?;

    for (col, (name, points)) in series.iter().enumerate() {
        chart
            .draw_series(LineSeries::new(
                points.iter().copied(),
                &Palette99::pick(col),
            ))
            .map_err(plot_err)?
            .label(name.as_str())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], &Palette99::pick(col))
            });
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(plot_err)?;
    root_area.present().map_err(plot_err)?;
    info!("plot saved into {}", path.display());
    Ok(())
}

fn on_grid(grid: &[f64], values: &[f64]) -> Vec<(f64, f64)> {
    grid.iter().copied().zip(values.iter().copied()).collect()
}

/// profiles on the common grid, the reference first
pub fn profile_series(report: &ComparisonReport) -> Vec<Series> {
    let mut series: Vec<Series> = report
        .profiles_on_grid
        .iter()
        .map(|(method, h)| {
            let name = if *method == report.reference {
                format!("{} (reference)", method)
            } else if report.is_flagged(*method) {
                format!("{} (flagged)", method)
            } else {
                method.to_string()
            };
            (name, on_grid(&report.grid, h))
        })
        .collect();
    series.sort_by_key(|(name, _)| !name.ends_with("(reference)"));
    series
}

/// |h - h_ref| of every non-reference method
pub fn error_series(report: &ComparisonReport) -> Vec<Series> {
    report
        .errors
        .iter()
        .filter(|(method, _)| **method != report.reference)
        .map(|(method, errors)| (method.to_string(), on_grid(&report.grid, &errors.abs_error)))
        .collect()
}

pub fn plot_profiles(report: &ComparisonReport, path: &Path) -> CorneaResult<()> {
    line_chart(path, "Corneal profile h(x)", "h", &profile_series(report))
}

pub fn plot_errors(report: &ComparisonReport, path: &Path) -> CorneaResult<()> {
    let series = error_series(report);
    if series.is_empty() {
        return Err(CorneaError::Plot(
            "no method besides the reference to plot errors for".to_string(),
        ));
    }
    line_chart(
        path,
        &format!("Absolute error vs {}", report.reference),
        "|h - h_ref|",
        &series,
    )
}

/// Draws both plots into `dir` (created if missing). The error plot is skipped
/// when only the reference was compared.
pub fn save_plots(report: &ComparisonReport, dir: &Path) -> CorneaResult<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    let path = dir.join(PROFILES_PNG);
    plot_profiles(report, &path)?;
    written.push(path);
    if !error_series(report).is_empty() {
        let path = dir.join(ERRORS_PNG);
        plot_errors(report, &path)?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn range_is_padded() {
        let series = vec![(
            "a".to_string(),
            vec![(0.0, 0.0), (1.0, 2.0), (0.5, f64::NAN)],
        )];
        let ((x0, x1), (y0, y1)) = padded_range(&series).unwrap();
        assert_relative_eq!(x0, -0.05);
        assert_relative_eq!(x1, 1.05);
        assert_relative_eq!(y0, -0.1);
        assert_relative_eq!(y1, 2.1);
    }

    #[test]
    fn flat_series_gets_a_visible_range() {
        let series = vec![("zero".to_string(), vec![(0.0, 0.0), (1.0, 0.0)])];
        let (_, (y0, y1)) = padded_range(&series).unwrap();
        assert!(y1 > y0);
        assert!(padded_range(&[]).is_none());
    }
}
