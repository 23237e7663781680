//! Yearly rate lines, one per stratum.

use super::{padded_range, plot_error, DrawResult};
use crate::data::StratifiedTable;
use crate::error::Result;
use plotters::prelude::*;
use std::path::Path;
use tracing::debug;

const SIZE: (u32, u32) = (1000, 600);

/// Draw every column of `table` against year and save it as a PNG.
pub fn plot_time_series(
    table: &StratifiedTable,
    title: &str,
    legend_title: &str,
    path: &Path,
) -> Result<()> {
    draw(table, title, legend_title, path).map_err(|e| plot_error(path, e))?;
    debug!(path = %path.display(), "rendered chart");
    Ok(())
}

fn draw(table: &StratifiedTable, title: &str, legend_title: &str, path: &Path) -> DrawResult<()> {
    let years = table.years();
    let first = years.first().copied().unwrap_or(0);
    let last = years.last().copied().unwrap_or(first).max(first + 1);
    let (y_min, y_max) = padded_range(table.data().iter(), 0.08);

    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 26))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d(first..last, y_min..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .light_line_style(BLACK.mix(0.05))
        .bold_line_style(BLACK.mix(0.2))
        .x_labels(years.len().max(2))
        .x_desc("Year")
        .y_desc("Obesity Rate (%)")
        .draw()?;

    // heading row of the legend
    chart
        .draw_series(std::iter::empty::<Circle<(i32, f64), i32>>())?
        .label(legend_title)
        .legend(|(x, y)| EmptyElement::at((x, y)));

    for (idx, stratum) in table.columns().iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        let points: Vec<(i32, f64)> = years
            .iter()
            .copied()
            .zip(table.column_at(idx))
            .collect();

        chart
            .draw_series(LineSeries::new(points.clone(), color.stroke_width(2)))?
            .label(stratum.as_str())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
            });
        chart.draw_series(points.into_iter().map(|p| Circle::new(p, 4, color.filled())))?;
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.85))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}
