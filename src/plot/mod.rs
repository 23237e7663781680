//! PNG charts for the comparison and regression stages.

pub mod heatmap;
pub mod line;
pub mod residuals;

pub use heatmap::{plot_heatmap, ylgnbu};
pub use line::plot_time_series;
pub use residuals::{
    density_histogram, gaussian_kde, plot_residual_distribution, plot_residuals_vs_fitted,
    scott_bandwidth, HistogramBin,
};

use crate::error::StrataError;
use std::path::Path;

type DrawResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;

fn plot_error(path: &Path, err: Box<dyn std::error::Error>) -> StrataError {
    StrataError::Plot(format!("{}: {}", path.display(), err))
}

/// `(min, max)` of finite values, padded by `pad` of the span on each side.
fn padded_range<'a, I: IntoIterator<Item = &'a f64>>(values: I, pad: f64) -> (f64, f64) {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() {
        return (0.0, 1.0);
    }
    let span = if hi > lo { hi - lo } else { 1.0 };
    (lo - pad * span, hi + pad * span)
}
