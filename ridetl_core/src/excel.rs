use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use logging_timer::time;
use rust_xlsxwriter::{Format, Workbook, Worksheet};

use crate::{
    formatting::{format_seconds, format_utc_date},
    model::{Ride, RideSample},
    summary::RideSummary,
};

/// The value of a single cell. Non-finite numbers become blank cells so that
/// NaN never shows up in the spreadsheet.
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Blank,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        if value.is_finite() {
            Cell::Number(value)
        } else {
            Cell::Blank
        }
    }
}

impl From<Option<usize>> for Cell {
    fn from(value: Option<usize>) -> Self {
        match value {
            Some(v) => Cell::Number(v as f64),
            None => Cell::Blank,
        }
    }
}

const SAMPLE_HEADERS: [&str; 21] = [
    "time",
    "lat",
    "lon",
    "ele",
    "segment_id",
    "delta_time",
    "elapsed_time",
    "moving_time",
    "delta_dist",
    "heading",
    "speed",
    "is_cruising",
    "delta_ele",
    "grade",
    "elapsed_ascent",
    "elapsed_descent",
    "elapsed_elevation",
    "training_window_id",
    "filt_speed",
    "filt_grade",
    "ride_id",
];

fn sample_cells(ride_id: &str, s: &RideSample) -> Result<[Cell; 21]> {
    Ok([
        Cell::Text(format_utc_date(s.time)?),
        s.lat.into(),
        s.lon.into(),
        s.ele.into(),
        Cell::Number(s.segment_id as f64),
        s.delta_time.into(),
        s.elapsed_time.into(),
        s.moving_time.into(),
        s.delta_dist.into(),
        s.heading.into(),
        s.speed.into(),
        Cell::Bool(s.is_cruising),
        s.delta_ele.into(),
        s.grade.into(),
        s.elapsed_ascent.into(),
        s.elapsed_descent.into(),
        s.elapsed_elevation.into(),
        s.training_window_id.into(),
        s.filt_speed.into(),
        s.filt_grade.into(),
        Cell::Text(ride_id.to_string()),
    ])
}

fn summary_rows(summary: &RideSummary) -> Result<Vec<(&'static str, Cell)>> {
    Ok(vec![
        ("Ride", Cell::Text(summary.ride_id.clone())),
        ("Start (UTC)", Cell::Text(format_utc_date(summary.start_time)?)),
        ("End (UTC)", Cell::Text(format_utc_date(summary.end_time)?)),
        ("Samples", Cell::Number(summary.row_count as f64)),
        ("Segments", Cell::Number(summary.segment_count as f64)),
        ("Elapsed time", Cell::Text(format_seconds(summary.elapsed_time))),
        ("Moving time", Cell::Text(format_seconds(summary.moving_time))),
        ("Distance (mi)", summary.distance.into()),
        ("Ascent (ft)", summary.elapsed_ascent.into()),
        ("Descent (ft)", summary.elapsed_descent.into()),
        ("Total climbing (ft)", summary.elapsed_elevation.into()),
        ("Average speed (mph)", summary.average_speed.into()),
        ("Cruise speed (mph)", summary.cruise_speed.into()),
        ("Max speed (mph)", summary.max_speed.into()),
        ("Training window", summary.training_window_id.into()),
    ])
}

fn write_cell(ws: &mut Worksheet, row: u32, col: u16, cell: &Cell) -> Result<()> {
    match cell {
        Cell::Blank => {}
        Cell::Text(s) => {
            ws.write_string(row, col, s)?;
        }
        Cell::Number(n) => {
            ws.write_number(row, col, *n)?;
        }
        Cell::Bool(b) => {
            ws.write_boolean(row, col, *b)?;
        }
    }

    Ok(())
}

/// Writes an enriched ride to an Excel workbook with a "Summary" sheet and a
/// "Samples" sheet holding one row per sample.
#[time]
pub fn write_ride_workbook(
    output_file: &Path,
    ride: &Ride,
    summary: Option<&RideSummary>,
) -> Result<()> {
    info!("Writing file {:?}", output_file);

    let bold = Format::new().set_bold();
    let mut workbook = Workbook::new();

    let summary_ws = workbook.add_worksheet();
    summary_ws.set_name("Summary")?;
    summary_ws.set_column_width(0, 22)?;
    summary_ws.set_column_width(1, 24)?;
    if let Some(summary) = summary {
        for (row, (label, value)) in summary_rows(summary)?.iter().enumerate() {
            summary_ws.write_string_with_format(row as u32, 0, *label, &bold)?;
            write_cell(summary_ws, row as u32, 1, value)?;
        }
    } else {
        summary_ws.write_string(0, 0, "The ride has no samples")?;
    }

    let samples_ws = workbook.add_worksheet();
    samples_ws.set_name("Samples")?;
    for (col, header) in SAMPLE_HEADERS.iter().enumerate() {
        samples_ws.write_string_with_format(0, col as u16, *header, &bold)?;
    }
    samples_ws.set_freeze_panes(1, 0)?;
    samples_ws.set_column_width(0, 22)?;

    for (idx, s) in ride.samples.iter().enumerate() {
        let row = idx as u32 + 1;
        for (col, cell) in sample_cells(&ride.ride_id, s)?.iter().enumerate() {
            write_cell(samples_ws, row, col as u16, cell)?;
        }
    }

    workbook
        .save(output_file)
        .with_context(|| format!("Failed to save workbook {:?}", output_file))?;

    let metadata = std::fs::metadata(output_file)?;
    info!(
        "Wrote {} rows to {:?}, {} Kb",
        ride.len(),
        output_file,
        metadata.len() / 1024
    );

    Ok(())
}
