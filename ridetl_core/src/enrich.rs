//! Derives the physical quantities (distance, heading, speed, cruise state,
//! grade and climbing) from consecutive samples.
//!
//! Distance and cruise state must not leak across a segment boundary, so they
//! are calculated per segment. Heading, elevation and training window are
//! calculated over the whole ride.

use anyhow::Result;
use log::debug;
use logging_timer::time;

use crate::{
    config::CruiseThresholds,
    cruise::cruise_states,
    geodesy::{grade_percent, haversine_miles, heading_degrees, speed_mph, FEET_PER_METRE},
    model::RideSample,
    partition::apply_partitioned,
    series::{cumulative_sum, diff, interpolate_gaps},
    training::TrainingWindows,
};

/// Fills in all the kinematic fields of a segmented, resampled series.
#[derive(Debug, Clone)]
pub struct KinematicEnricher {
    cruise: CruiseThresholds,
    windows: TrainingWindows,
}

impl KinematicEnricher {
    pub fn new(cruise: CruiseThresholds, windows: TrainingWindows) -> Self {
        Self { cruise, windows }
    }

    /// Runs every enrichment, in dependency order.
    pub fn run(&self, samples: Vec<RideSample>) -> Result<Vec<RideSample>> {
        let mut samples = per_segment(samples, |segment| {
            calculate_distance(segment);
        })?;

        calculate_heading(&mut samples);
        calculate_speed(&mut samples);

        let cruise = self.cruise;
        let mut samples = per_segment(samples, move |segment| {
            calculate_cruise_state(segment, &cruise);
        })?;

        convert_elevation_to_feet(&mut samples);
        calculate_grade(&mut samples);
        calculate_cumulative_elevation(&mut samples);
        assign_training_windows(&mut samples, &self.windows);

        let cruising = samples.iter().filter(|s| s.is_cruising).count();
        debug!(
            "Enriched {} samples, {cruising} of them cruising",
            samples.len()
        );

        Ok(samples)
    }
}

/// Applies an in-place calculation to each segment separately.
#[time]
fn per_segment<F>(samples: Vec<RideSample>, calculation: F) -> Result<Vec<RideSample>>
where
    F: Fn(&mut [RideSample]) + Send + Sync,
{
    apply_partitioned(
        samples,
        |s: &RideSample| s.segment_id,
        |s: &RideSample| s.time,
        |mut segment| {
            calculation(segment.as_mut_slice());
            Ok(segment)
        },
    )
}

/// Sets `delta_dist` (miles) from each sample to the one before. The first
/// sample has nothing before it and gets NaN, which is why this must be run
/// per segment: otherwise the first sample of a segment would get a bogus jump
/// from the end of the previous one.
pub fn calculate_distance(segment: &mut [RideSample]) {
    for idx in 0..segment.len() {
        segment[idx].delta_dist = if idx == 0 {
            f64::NAN
        } else {
            let prev = &segment[idx - 1];
            haversine_miles(prev.lat, prev.lon, segment[idx].lat, segment[idx].lon)
        };
    }
}

/// Sets `heading` from the change in position since the previous sample.
/// The first sample is treated as not having moved.
pub fn calculate_heading(samples: &mut [RideSample]) {
    let lats: Vec<f64> = samples.iter().map(|s| s.lat).collect();
    let lons: Vec<f64> = samples.iter().map(|s| s.lon).collect();
    let delta_lats = diff(&lats, 0.0);
    let delta_lons = diff(&lons, 0.0);

    for (idx, s) in samples.iter_mut().enumerate() {
        s.heading = heading_degrees(delta_lats[idx], delta_lons[idx]);
    }
}

/// Sets `speed` (mph). Zero time or an undefined distance give non-finite
/// values, which are left for consumers to deal with.
pub fn calculate_speed(samples: &mut [RideSample]) {
    for s in samples {
        s.speed = speed_mph(s.delta_dist, s.delta_time);
    }
}

/// Sets `is_cruising` for one segment.
pub fn calculate_cruise_state(segment: &mut [RideSample], thresholds: &CruiseThresholds) {
    let speeds: Vec<f64> = segment.iter().map(|s| s.speed).collect();
    for (s, state) in segment.iter_mut().zip(cruise_states(&speeds, thresholds)) {
        s.is_cruising = state.is_cruising();
    }
}

/// Converts `ele` from metres to feet.
pub fn convert_elevation_to_feet(samples: &mut [RideSample]) {
    for s in samples {
        s.ele *= FEET_PER_METRE;
    }
}

/// Sets `delta_ele` (feet, 0 for the first sample) and `grade` (percent).
pub fn calculate_grade(samples: &mut [RideSample]) {
    let eles: Vec<f64> = samples.iter().map(|s| s.ele).collect();
    for (s, delta_ele) in samples.iter_mut().zip(diff(&eles, 0.0)) {
        s.delta_ele = delta_ele;
        s.grade = grade_percent(delta_ele, s.delta_dist);
    }
}

/// Sets the running ascent, descent and total elevation change.
///
/// Climbing and descending samples are accumulated separately. A sample that
/// does not contribute to one of the totals leaves a gap in it, and the gaps
/// are then filled by interpolating between their neighbours. A flat sample
/// contributes zero to both.
pub fn calculate_cumulative_elevation(samples: &mut [RideSample]) {
    let ascents: Vec<f64> = samples
        .iter()
        .map(|s| if s.delta_ele >= 0.0 { s.delta_ele } else { f64::NAN })
        .collect();
    let descents: Vec<f64> = samples
        .iter()
        .map(|s| if s.delta_ele <= 0.0 { s.delta_ele } else { f64::NAN })
        .collect();

    let mut ascent = cumulative_sum(&ascents);
    let mut descent = cumulative_sum(&descents);
    interpolate_gaps(&mut ascent);
    interpolate_gaps(&mut descent);

    for (idx, s) in samples.iter_mut().enumerate() {
        s.elapsed_ascent = ascent[idx];
        s.elapsed_descent = descent[idx].abs();
        s.elapsed_elevation = s.elapsed_ascent + s.elapsed_descent;
    }
}

/// Sets `training_window_id` from the sample time.
pub fn assign_training_windows(samples: &mut [RideSample], windows: &TrainingWindows) {
    for s in samples {
        s.training_window_id = windows.window_id(s.time);
    }
}
