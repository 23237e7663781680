//! Residual diagnostics: residuals against fitted values, and their distribution.

use super::{padded_range, plot_error, DrawResult};
use crate::error::{Result, StrataError};
use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::path::Path;
use tracing::debug;

const SIZE: (u32, u32) = (800, 600);
const KDE_POINTS: usize = 200;

/// One bar of a density-scaled histogram.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
    /// `count / (n * width)`, so the bars integrate to one.
    pub density: f64,
}

/// Bin `values` into `bins` equal-width bins spanning their range.
///
/// The last bin is closed on the right. Non-finite values are ignored.
pub fn density_histogram(values: &[f64], bins: usize) -> Result<Vec<HistogramBin>> {
    if bins == 0 {
        return Err(StrataError::InvalidParameter(
            "Histogram needs at least one bin".to_string(),
        ));
    }
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return Err(StrataError::EmptyData("No values to bin".to_string()));
    }

    let mut lo = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let mut hi = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if hi <= lo {
        lo -= 0.5;
        hi += 0.5;
    }
    let width = (hi - lo) / bins as f64;

    let mut counts = vec![0usize; bins];
    for v in &finite {
        let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }

    let n = finite.len() as f64;
    Ok(counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: lo + i as f64 * width,
            upper: lo + (i + 1) as f64 * width,
            count,
            density: count as f64 / (n * width),
        })
        .collect())
}

/// Scott's rule bandwidth, `n^(-1/5)` times the sample standard deviation.
pub fn scott_bandwidth(sample: &[f64]) -> f64 {
    let n = sample.len() as f64;
    let mean = sample.iter().sum::<f64>() / n;
    let var = sample.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    n.powf(-0.2) * var.sqrt()
}

/// Gaussian kernel density estimate of `sample` evaluated at `points`.
pub fn gaussian_kde(sample: &[f64], bandwidth: f64, points: &[f64]) -> Vec<f64> {
    let n = sample.len() as f64;
    let norm = 1.0 / (n * bandwidth * (2.0 * PI).sqrt());
    points
        .iter()
        .map(|x| {
            norm * sample
                .iter()
                .map(|xi| (-0.5 * ((x - xi) / bandwidth).powi(2)).exp())
                .sum::<f64>()
        })
        .collect()
}

/// Scatter residuals against fitted values with a dashed reference line at zero.
pub fn plot_residuals_vs_fitted(
    fitted: &[f64],
    residuals: &[f64],
    title: &str,
    path: &Path,
) -> Result<()> {
    if fitted.len() != residuals.len() {
        return Err(StrataError::DimensionMismatch {
            expected: fitted.len(),
            actual: residuals.len(),
        });
    }
    draw_scatter(fitted, residuals, title, path).map_err(|e| plot_error(path, e))?;
    debug!(path = %path.display(), "rendered residual scatter");
    Ok(())
}

fn draw_scatter(fitted: &[f64], residuals: &[f64], title: &str, path: &Path) -> DrawResult<()> {
    let (x_min, x_max) = padded_range(fitted, 0.05);
    let (r_min, r_max) = padded_range(residuals, 0.1);
    let bound = r_min.abs().max(r_max.abs());

    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 22))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, -bound..bound)?;

    chart
        .configure_mesh()
        .light_line_style(BLACK.mix(0.05))
        .x_desc("Fitted Values")
        .y_desc("Residuals")
        .draw()?;

    chart.draw_series(
        fitted
            .iter()
            .zip(residuals)
            .map(|(&x, &r)| Circle::new((x, r), 3, BLUE.mix(0.6).filled())),
    )?;

    let dash = (x_max - x_min) / 80.0;
    chart.draw_series((0..40).map(|k| {
        let start = x_min + 2.0 * k as f64 * dash;
        PathElement::new(vec![(start, 0.0), (start + dash, 0.0)], RED.stroke_width(1))
    }))?;

    root.present()?;
    Ok(())
}

/// Histogram of residuals (density scale) with a KDE overlay.
pub fn plot_residual_distribution(
    residuals: &[f64],
    bins: usize,
    title: &str,
    path: &Path,
) -> Result<()> {
    if residuals.len() < 2 {
        return Err(StrataError::InsufficientData {
            test: "Residual density",
            needed: 2,
            actual: residuals.len(),
        });
    }
    let histogram = density_histogram(residuals, bins)?;
    draw_distribution(residuals, &histogram, title, path).map_err(|e| plot_error(path, e))?;
    debug!(path = %path.display(), "rendered residual distribution");
    Ok(())
}

fn draw_distribution(
    residuals: &[f64],
    histogram: &[HistogramBin],
    title: &str,
    path: &Path,
) -> DrawResult<()> {
    let bandwidth = scott_bandwidth(residuals);
    let lo = histogram.first().map_or(0.0, |b| b.lower);
    let hi = histogram.last().map_or(1.0, |b| b.upper);
    let x_lo = lo - 3.0 * bandwidth;
    let x_hi = hi + 3.0 * bandwidth;

    let grid: Vec<f64> = (0..KDE_POINTS)
        .map(|i| x_lo + (x_hi - x_lo) * i as f64 / (KDE_POINTS - 1) as f64)
        .collect();
    let density = if bandwidth > 0.0 {
        gaussian_kde(residuals, bandwidth, &grid)
    } else {
        Vec::new()
    };

    let peak = histogram
        .iter()
        .map(|b| b.density)
        .chain(density.iter().copied())
        .fold(0.0, f64::max);

    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 22))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d(x_lo..x_hi, 0.0..peak * 1.1 + f64::EPSILON)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .light_line_style(BLACK.mix(0.05))
        .x_desc("Residuals")
        .y_desc("Density")
        .draw()?;

    chart.draw_series(histogram.iter().map(|b| {
        Rectangle::new([(b.lower, 0.0), (b.upper, b.density)], BLUE.mix(0.4).filled())
    }))?;
    chart.draw_series(histogram.iter().map(|b| {
        Rectangle::new([(b.lower, 0.0), (b.upper, b.density)], BLUE.mix(0.8))
    }))?;

    if !density.is_empty() {
        chart.draw_series(LineSeries::new(
            grid.into_iter().zip(density),
            BLUE.stroke_width(2),
        ))?;
    }

    root.present()?;
    Ok(())
}
