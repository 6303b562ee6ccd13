#![cfg(not(tarpaulin_include))]
#![cfg(feature = "web")]

use plotters::prelude::*;

use crate::analytics::{DayUsage, GasUsage};

/// Configuration options for dashboard chart rendering.
#[derive(Clone, Debug)]
pub struct ChartOptions {
    /// Title displayed at the top of the chart
    pub title: String,

    /// Label for the X-axis
    pub x_label: String,

    /// Label for the Y-axis
    pub y_label: String,

    /// Width of the chart in pixels
    pub width: u32,

    /// Height of the chart in pixels
    pub height: u32,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            title: "Usage".to_string(),
            x_label: String::new(),
            y_label: "Pounds".to_string(),
            width: 800,
            height: 400,
        }
    }
}

/// Render the per-refrigerant consumption bar chart.
///
/// One bar per group, in the order the aggregation produced them (first
/// appearance in the snapshot); that order is the chart's contract, so no
/// re-sorting happens here. An empty input renders an axes-only chart.
///
/// # Returns
/// * PNG image data as bytes, or a rendering error
pub fn gas_bar_chart(
    groups: &[GasUsage],
    options: &ChartOptions,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let (width, height) = (options.width, options.height);
    let mut buffer = vec![0u8; (width * height * 3) as usize];

    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE)?;

        let max_y = groups.iter().map(|g| g.amount).fold(0.0f64, f64::max);
        let y_max = if max_y > 0.0 { max_y * 1.1 } else { 1.0 };
        let x_max = groups.len().max(1) as i32;

        let mut chart = ChartBuilder::on(&root)
            .caption(&options.title, ("sans-serif", 30).into_font())
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(50)
            .build_cartesian_2d(0..x_max, 0.0..y_max)?;

        chart
            .configure_mesh()
            .x_desc(&options.x_label)
            .y_desc(&options.y_label)
            .x_labels(groups.len().max(1))
            .x_label_formatter(&|x| {
                groups
                    .get(*x as usize)
                    .map(|g| g.name.clone())
                    .unwrap_or_default()
            })
            .draw()?;

        chart.draw_series(groups.iter().enumerate().map(|(i, group)| {
            let x = i as i32;
            Rectangle::new([(x, 0.0), (x + 1, group.amount)], BLUE.filled())
        }))?;

        root.present()?;
    }

    encode_png(buffer, width, height)
}

/// Render the per-day consumption area chart.
///
/// The input runs oldest-day-first, so the series reads left-to-right
/// chronologically. An empty input renders an axes-only chart.
///
/// # Returns
/// * PNG image data as bytes, or a rendering error
pub fn timeline_area_chart(
    days: &[DayUsage],
    options: &ChartOptions,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let (width, height) = (options.width, options.height);
    let mut buffer = vec![0u8; (width * height * 3) as usize];

    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE)?;

        let max_y = days.iter().map(|d| d.amount).fold(0.0f64, f64::max);
        let y_max = if max_y > 0.0 { max_y * 1.1 } else { 1.0 };
        let x_max = (days.len() as i32 - 1).max(1);

        let mut chart = ChartBuilder::on(&root)
            .caption(&options.title, ("sans-serif", 30).into_font())
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(50)
            .build_cartesian_2d(0..x_max, 0.0..y_max)?;

        chart
            .configure_mesh()
            .x_desc(&options.x_label)
            .y_desc(&options.y_label)
            .x_labels(days.len().max(2))
            .x_label_formatter(&|x| {
                days.get(*x as usize)
                    .map(|d| d.date.clone())
                    .unwrap_or_default()
            })
            .draw()?;

        chart.draw_series(AreaSeries::new(
            days.iter()
                .enumerate()
                .map(|(i, day)| (i as i32, day.amount)),
            0.0,
            BLUE.mix(0.2),
        ))?;

        chart.draw_series(LineSeries::new(
            days.iter()
                .enumerate()
                .map(|(i, day)| (i as i32, day.amount)),
            &BLUE,
        ))?;

        root.present()?;
    }

    encode_png(buffer, width, height)
}

// Encode the raw RGB backend buffer as a PNG.
fn encode_png(buffer: Vec<u8>, width: u32, height: u32) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let img = image::RgbImage::from_raw(width, height, buffer)
        .ok_or("chart buffer size mismatch")?;

    let mut png = Vec::new();
    img.write_to(
        &mut std::io::Cursor::new(&mut png),
        image::ImageOutputFormat::Png,
    )?;

    Ok(png)
}
