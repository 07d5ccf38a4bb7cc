use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use ridetl_core::config::{CruiseThresholds, PipelineParameters, TrainingWindowParameters};
use time::{format_description, Date};

/// Returns the parsed command line options.
pub fn parse_args() -> Args {
    Args::parse()
}

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[arg(
        short,
        long,
        default_value = "false",
        help = "Overwrite output files even if they already exist"
    )]
    pub force: bool,

    #[arg(
        short,
        long,
        help = "Directory to write the '.enriched.xlsx' files to. Defaults to the \
                directory of each input file."
    )]
    pub output_dir: Option<PathBuf>,

    #[arg(
        long,
        default_value = "15.0",
        help = "A gap between samples of at least this many seconds starts a new segment"
    )]
    pub gap_threshold: f64,

    #[arg(
        long,
        default_value = "8.0",
        help = "The speed, in mph, you must reach to start cruising"
    )]
    pub cruise_upper: f64,

    #[arg(
        long,
        default_value = "5.0",
        help = "The speed, in mph, you must drop below to stop cruising"
    )]
    pub cruise_lower: f64,

    #[arg(
        long,
        default_value = "10",
        help = "Number of samples in the window used to smooth speed and grade"
    )]
    pub filter_order: usize,

    #[arg(
        long,
        default_value = "2019-01-07",
        help = "The date (YYYY-MM-DD) the first training window starts on"
    )]
    pub training_epoch: String,

    #[arg(long, default_value = "8", help = "The length of a training window in weeks")]
    pub training_period_weeks: u32,

    #[arg(
        long,
        default_value = "130",
        help = "The number of training windows to generate"
    )]
    pub training_window_count: usize,

    #[arg(
        help = "List of files to process. Any file that does not have a 'gpx' extension will be ignored."
    )]
    pub files: Vec<PathBuf>,
}

impl Args {
    /// Returns the input files that have a 'gpx' extension.
    pub fn files(&self) -> Vec<PathBuf> {
        self.files
            .iter()
            .filter(|f| {
                f.extension()
                    .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("gpx"))
            })
            .cloned()
            .collect()
    }

    /// Builds the pipeline parameters. They are validated when the pipeline
    /// is created.
    pub fn to_parameters(&self) -> Result<PipelineParameters> {
        Ok(PipelineParameters {
            gap_threshold_seconds: self.gap_threshold,
            cruise: CruiseThresholds {
                upper_mph: self.cruise_upper,
                lower_mph: self.cruise_lower,
            },
            filter_order: self.filter_order,
            training: TrainingWindowParameters {
                epoch: parse_date(&self.training_epoch)?,
                period_weeks: self.training_period_weeks,
                window_count: self.training_window_count,
            },
        })
    }

    /// Returns the name of the workbook to write for `input_file`.
    pub fn output_file(&self, input_file: &Path) -> PathBuf {
        let mut output = match &self.output_dir {
            Some(dir) => match input_file.file_name() {
                Some(name) => dir.join(name),
                None => input_file.to_owned(),
            },
            None => input_file.to_owned(),
        };

        output.set_extension("enriched.xlsx");
        output
    }
}

fn parse_date(s: &str) -> Result<Date> {
    let format = format_description::parse("[year]-[month]-[day]")?;
    Date::parse(s, &format).with_context(|| format!("Invalid date {s:?}, expected YYYY-MM-DD"))
}
