//! Annotated heatmap of the income × education prediction grid.

use super::{plot_error, DrawResult};
use crate::error::Result;
use nalgebra::DMatrix;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::Path;
use tracing::debug;

const SIZE: (u32, u32) = (1200, 800);

// ColorBrewer YlGnBu, light to dark.
const YLGNBU: [(u8, u8, u8); 9] = [
    (255, 255, 217),
    (237, 248, 177),
    (199, 233, 180),
    (127, 205, 187),
    (65, 182, 196),
    (29, 145, 192),
    (34, 94, 168),
    (37, 52, 148),
    (8, 29, 88),
];

/// Map `t` in [0, 1] onto the YlGnBu ramp.
pub fn ylgnbu(t: f64) -> RGBColor {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = t * (YLGNBU.len() - 1) as f64;
    let lo = (scaled.floor() as usize).min(YLGNBU.len() - 2);
    let frac = scaled - lo as f64;
    let (a, b) = (YLGNBU[lo], YLGNBU[lo + 1]);
    let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * frac).round() as u8;
    RGBColor(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

/// Draw `values` (rows labelled by `row_labels`, top to bottom) as a heatmap.
pub fn plot_heatmap(
    values: &DMatrix<f64>,
    row_labels: &[String],
    col_labels: &[String],
    title: &str,
    path: &Path,
) -> Result<()> {
    draw(values, row_labels, col_labels, title, path).map_err(|e| plot_error(path, e))?;
    debug!(path = %path.display(), "rendered heatmap");
    Ok(())
}

fn draw(
    values: &DMatrix<f64>,
    row_labels: &[String],
    col_labels: &[String],
    title: &str,
    path: &Path,
) -> DrawResult<()> {
    let n_rows = values.nrows() as i32;
    let n_cols = values.ncols() as i32;
    let lo = values.min();
    let hi = values.max();
    let span = if hi > lo { hi - lo } else { 1.0 };
    let scale = |v: f64| (v - lo) / span;

    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let (main, bar) = root.split_horizontally(SIZE.0 - 140);

    let mut chart = ChartBuilder::on(&main)
        .caption(title, ("sans-serif", 26))
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(170)
        .build_cartesian_2d((0..n_cols).into_segmented(), (0..n_rows).into_segmented())?;

    // row 0 is drawn at the top
    let row_at = |i: i32| n_rows - 1 - i;
    let x_label = |v: &SegmentValue<i32>| match v {
        SegmentValue::CenterOf(j) => col_labels.get(*j as usize).cloned().unwrap_or_default(),
        _ => String::new(),
    };
    let y_label = |v: &SegmentValue<i32>| match v {
        SegmentValue::CenterOf(i) => row_labels
            .get(row_at(*i) as usize)
            .cloned()
            .unwrap_or_default(),
        _ => String::new(),
    };

    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(n_cols as usize)
        .y_labels(n_rows as usize)
        .x_label_formatter(&x_label)
        .y_label_formatter(&y_label)
        .x_desc("Education Level")
        .y_desc("Income Group")
        .draw()?;

    for i in 0..n_rows {
        for j in 0..n_cols {
            let v = values[(i as usize, j as usize)];
            let y = row_at(i);
            chart.draw_series(std::iter::once(Rectangle::new(
                [
                    (SegmentValue::Exact(j), SegmentValue::Exact(y)),
                    (SegmentValue::Exact(j + 1), SegmentValue::Exact(y + 1)),
                ],
                ylgnbu(scale(v)).filled(),
            )))?;

            let text_color = if scale(v) > 0.6 { WHITE } else { BLACK };
            let style = ("sans-serif", 20)
                .into_font()
                .color(&text_color)
                .pos(Pos::new(HPos::Center, VPos::Center));
            chart.draw_series(std::iter::once(Text::new(
                format!("{:.1}", v),
                (SegmentValue::CenterOf(j), SegmentValue::CenterOf(y)),
                style,
            )))?;
        }
    }

    draw_colorbar(&bar, lo, hi)?;
    root.present()?;
    Ok(())
}

fn draw_colorbar(area: &DrawingArea<BitMapBackend<'_>, Shift>, lo: f64, hi: f64) -> DrawResult<()> {
    let top = if hi > lo { hi } else { lo + 1.0 };
    let mut bar = ChartBuilder::on(area)
        .margin_top(60)
        .margin_bottom(65)
        .margin_right(10)
        .y_label_area_size(70)
        .build_cartesian_2d(0.0..1.0, lo..top)?;

    bar.configure_mesh()
        .disable_mesh()
        .disable_x_axis()
        .y_desc("Predicted Obesity Rate")
        .draw()?;

    let steps = 100;
    let step = (top - lo) / steps as f64;
    bar.draw_series((0..steps).map(|k| {
        let v0 = lo + k as f64 * step;
        Rectangle::new([(0.0, v0), (1.0, v0 + step)], ylgnbu(k as f64 / steps as f64).filled())
    }))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ramp_endpoints() {
        assert_eq!(ylgnbu(0.0), RGBColor(255, 255, 217));
        assert_eq!(ylgnbu(1.0), RGBColor(8, 29, 88));
        assert_eq!(ylgnbu(f64::NAN), ylgnbu(0.0));
        assert_eq!(ylgnbu(2.0), ylgnbu(1.0));
    }

    #[test]
    fn test_ramp_darkens() {
        let brightness = |c: RGBColor| c.0 as u32 + c.1 as u32 + c.2 as u32;
        let samples: Vec<u32> = (0..=10).map(|k| brightness(ylgnbu(k as f64 / 10.0))).collect();
        assert!(samples.windows(2).all(|w| w[0] >= w[1]));
    }
}
