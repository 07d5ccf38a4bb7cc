use anyhow::{bail, Context, Result};
use log::{debug, info};
use rayon::prelude::*;

use crate::{
    config::PipelineParameters,
    enrich::KinematicEnricher,
    filter::SignalFilter,
    model::{Ride, RideSample},
    segment::Segmenter,
    training::TrainingWindows,
};

/// Runs a ride through segmentation, enrichment and filtering. The pipeline
/// holds no per-ride state, so one instance can process any number of rides,
/// concurrently if need be.
#[derive(Debug, Clone)]
pub struct RidePipeline {
    parameters: PipelineParameters,
    segmenter: Segmenter,
    enricher: KinematicEnricher,
    filter: SignalFilter,
}

impl RidePipeline {
    /// Validates the parameters and builds the stages.
    pub fn new(parameters: PipelineParameters) -> Result<Self> {
        parameters
            .validate()
            .context("Invalid pipeline parameters")?;

        let windows = TrainingWindows::new(&parameters.training)?;
        Ok(Self {
            segmenter: Segmenter::new(parameters.gap_threshold_seconds),
            enricher: KinematicEnricher::new(parameters.cruise, windows),
            filter: SignalFilter::new(parameters.filter_order),
            parameters,
        })
    }

    pub fn parameters(&self) -> &PipelineParameters {
        &self.parameters
    }

    /// Processes a single ride. On error nothing of the ride is returned.
    pub fn process(&self, ride: Ride) -> Result<Ride> {
        let Ride {
            ride_id,
            filename,
            samples,
        } = ride;

        let samples = self
            .run_stages(samples)
            .with_context(|| format!("Failed to process ride {ride_id}"))?;

        Ok(Ride {
            ride_id,
            filename,
            samples,
        })
    }

    /// Processes several rides in parallel. Every ride gets its own result,
    /// in the same order as the input, and a failed ride does not affect the
    /// others.
    pub fn process_all(&self, rides: Vec<Ride>) -> Vec<(String, Result<Ride>)> {
        info!("Processing {} rides", rides.len());
        rides
            .into_par_iter()
            .map(|ride| (ride.ride_id.clone(), self.process(ride)))
            .collect()
    }

    fn run_stages(&self, samples: Vec<RideSample>) -> Result<Vec<RideSample>> {
        validate_samples(&samples)?;
        let raw_count = samples.len();

        let samples = self.segmenter.run(samples).context("Segmentation failed")?;
        let samples = self.enricher.run(samples).context("Enrichment failed")?;
        let samples = self.filter.run(samples).context("Filtering failed")?;

        debug!("{raw_count} raw samples became {} resampled samples", samples.len());
        Ok(samples)
    }
}

/// Rejects positions that cannot be real.
fn validate_samples(samples: &[RideSample]) -> Result<()> {
    for (idx, s) in samples.iter().enumerate() {
        if !s.lat.is_finite() || !(-90.0..=90.0).contains(&s.lat) {
            bail!("Sample {idx} at {} has an invalid latitude {}", s.time, s.lat);
        }
        if !s.lon.is_finite() || !(-180.0..=180.0).contains(&s.lon) {
            bail!("Sample {idx} at {} has an invalid longitude {}", s.time, s.lon);
        }
    }

    Ok(())
}
