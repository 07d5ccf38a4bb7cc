use std::io::Write;

use anyhow::{bail, Result};
use args::{parse_args, Args};
use clap::builder::styling::AnsiColor;
use env_logger::Builder;
use log::{debug, error, info, warn};
use logging_timer::time;
use ridetl_core::{
    excel::write_ride_workbook,
    formatting::format_seconds,
    model::Ride,
    pipeline::RidePipeline,
    read::read_ride_from_file,
    summary::RideSummary,
};

mod args;

pub const PROGRAM_NAME: &str = env!("CARGO_PKG_NAME");

#[time]
fn main() -> Result<()> {
    configure_logging();
    info!("Starting {PROGRAM_NAME}");

    let args = parse_args();
    debug!("{:?}", &args);
    if args.force {
        info!("'--force' specified, all existing output files will be overwritten");
    }

    let pipeline = RidePipeline::new(args.to_parameters()?)?;
    debug!("{:?}", pipeline.parameters());

    let input_files = args.files();
    if input_files.is_empty() {
        warn!("No .gpx files specified, exiting");
        return Ok(());
    }

    // Skip any files whose output already exists. It's wasteful to read
    // them just to throw the result away.
    let mut failures = 0;
    let mut rides = Vec::new();
    for f in &input_files {
        let output_file = args.output_file(f);
        if output_file.exists() && !args.force {
            info!("Skipping {:?} because {:?} already exists", f, output_file);
            continue;
        }

        match read_ride_from_file(f) {
            Ok(ride) => rides.push(ride),
            Err(e) => {
                error!("{e:#}");
                failures += 1;
            }
        }
    }

    for (ride_id, result) in pipeline.process_all(rides) {
        let outcome = result.and_then(|ride| write_outputs(&args, &ride));
        if let Err(e) = outcome {
            error!("Ride {ride_id}: {e:#}");
            failures += 1;
        }
    }

    if failures > 0 {
        bail!("{failures} of {} input files could not be processed", input_files.len());
    }

    Ok(())
}

fn write_outputs(args: &Args, ride: &Ride) -> Result<()> {
    let summary = RideSummary::from_ride(ride);
    match &summary {
        Some(s) => info!(
            "Ride {}: {} samples in {} segments, {:.2} miles, moving time {}, {:.0} ft climbed",
            s.ride_id,
            s.row_count,
            s.segment_count,
            s.distance,
            format_seconds(s.moving_time),
            s.elapsed_ascent
        ),
        None => warn!("Ride {} has no samples", ride.ride_id),
    }

    let Some(input_file) = &ride.filename else {
        bail!("Ride {} was not read from a file, so there is nowhere to write it", ride.ride_id);
    };

    let output_file = args.output_file(input_file);
    write_ride_workbook(&output_file, ride, summary.as_ref())
}

fn configure_logging() {
    let mut builder = Builder::from_default_env();
    if std::env::var_os("RUST_LOG").is_none() {
        builder.filter_level(log::LevelFilter::Info);
    }

    builder.format(|buf, record| {
        let level_style = buf.default_level_style(record.level());
        let level_style = match record.level() {
            log::Level::Error => level_style.fg_color(Some(AnsiColor::Red.into())),
            log::Level::Warn => level_style.fg_color(Some(AnsiColor::Yellow.into())),
            log::Level::Info => level_style.fg_color(Some(AnsiColor::Green.into())),
            log::Level::Debug => level_style.fg_color(Some(AnsiColor::Blue.into())),
            log::Level::Trace => level_style.fg_color(Some(AnsiColor::Magenta.into())),
        };

        let line_number_style = buf
            .default_level_style(record.level())
            .fg_color(Some(AnsiColor::Cyan.into()));

        match (record.file(), record.line()) {
            (Some(file), Some(line)) => writeln!(
                buf,
                "[{} {level_style}{}{level_style:#} {}/{line_number_style}{}{line_number_style:#}] {}",
                buf.timestamp(),
                record.level(),
                file,
                line,
                record.args()
            ),
            (Some(file), None) => writeln!(
                buf,
                "[{} {level_style}{}{level_style:#} {}] {}",
                buf.timestamp(),
                record.level(),
                file,
                record.args()
            ),
            _ => writeln!(
                buf,
                "[{} {level_style}{}{level_style:#}] {}",
                buf.timestamp(),
                record.level(),
                record.args()
            ),
        }
    });

    builder.init();
}
