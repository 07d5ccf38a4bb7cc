//! A handful of per-ride numbers calculated from an enriched ride.

use std::collections::BTreeMap;

use time::OffsetDateTime;

use crate::model::{Ride, RideSample};

/// The summary of one enriched ride.
#[derive(Debug, Clone)]
pub struct RideSummary {
    pub ride_id: String,
    pub start_time: OffsetDateTime,
    pub end_time: OffsetDateTime,
    pub row_count: usize,
    pub segment_count: usize,
    /// Seconds from the start of the ride, including gaps.
    pub elapsed_time: f64,
    /// Seconds spent inside segments.
    pub moving_time: f64,
    /// Total distance in miles.
    pub distance: f64,
    /// Feet.
    pub elapsed_ascent: f64,
    /// Feet.
    pub elapsed_descent: f64,
    /// Feet.
    pub elapsed_elevation: f64,
    /// Mean speed in mph.
    pub average_speed: f64,
    /// Mean speed in mph while cruising. NaN if the rider never cruised.
    pub cruise_speed: f64,
    /// Maximum smoothed speed in mph.
    pub max_speed: f64,
    pub training_window_id: Option<usize>,
}

impl RideSummary {
    /// Summarises an enriched ride. Returns None if there is nothing to
    /// summarise.
    pub fn from_ride(ride: &Ride) -> Option<Self> {
        let first = ride.samples.first()?;
        let last = ride.samples.last()?;

        Some(Self {
            ride_id: ride.ride_id.clone(),
            start_time: first.time,
            end_time: last.time,
            row_count: ride.len(),
            segment_count: ride.segment_count(),
            elapsed_time: last.elapsed_time,
            moving_time: total_moving_time(&ride.samples),
            distance: ride
                .samples
                .iter()
                .map(|s| s.delta_dist)
                .filter(|d| d.is_finite())
                .sum(),
            elapsed_ascent: last.elapsed_ascent,
            elapsed_descent: last.elapsed_descent,
            elapsed_elevation: last.elapsed_elevation,
            average_speed: finite_mean(ride.samples.iter().map(|s| s.speed)),
            cruise_speed: finite_mean(
                ride.samples
                    .iter()
                    .filter(|s| s.is_cruising)
                    .map(|s| s.speed),
            ),
            max_speed: ride
                .samples
                .iter()
                .map(|s| s.filt_speed)
                .filter(|v| v.is_finite())
                .max_by(|a, b| a.total_cmp(b))
                .unwrap_or(f64::NAN),
            training_window_id: first.training_window_id,
        })
    }
}

/// `moving_time` restarts in every segment, so the ride total is the sum of
/// the final value in each segment.
fn total_moving_time(samples: &[RideSample]) -> f64 {
    let mut last_by_segment: BTreeMap<usize, f64> = BTreeMap::new();
    for s in samples {
        last_by_segment.insert(s.segment_id, s.moving_time);
    }
    last_by_segment.values().sum()
}

/// Mean of the finite values, NaN if there are none.
fn finite_mean<I: Iterator<Item = f64>>(values: I) -> f64 {
    let (sum, count) = values
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}
