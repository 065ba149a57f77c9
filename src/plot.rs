//! Plots of a training run

use std::error::Error;

use plotters::{
    chart::ChartBuilder,
    prelude::{BitMapBackend, Circle, IntoDrawingArea},
    series::LineSeries,
    style::{BLUE, Color, RED, WHITE},
};

/// Plots the loss of each generation, as returned by [`crate::train::train`]
pub fn plot_loss(history: &[f64], file_name: &str) -> Result<(), Box<dyn Error>> {
    if history.is_empty() {
        return Err("no loss history to plot".into());
    }
    let root_area = BitMapBackend::new(file_name, (640, 480)).into_drawing_area();
    root_area.fill(&WHITE)?;

    let max_loss = history.iter().cloned().fold(f64::MIN, f64::max);
    let y_max = if max_loss > 0.0 { max_loss * 1.05 } else { 1.0 };

    let mut chart = ChartBuilder::on(&root_area)
        .caption("Training loss", ("sans-serif", 40))
        .margin(20)
        .x_label_area_size(30)
        .y_label_area_size(40)
        .build_cartesian_2d(0usize..history.len(), 0.0..y_max)?;

    chart
        .configure_mesh()
        .x_desc("generation")
        .y_desc("loss")
        .draw()?;

    chart.draw_series(LineSeries::new(
        history.iter().enumerate().map(|(i, l)| (i, *l)),
        BLUE.stroke_width(2),
    ))?;

    // mark the final loss
    let last = history.len() - 1;
    chart.draw_series(std::iter::once(Circle::new(
        (last, history[last]),
        4,
        RED.filled(),
    )))?;

    root_area.present()?;
    log::info!("Loss plot has been saved to '{}'.", file_name);

    Ok(())
}
