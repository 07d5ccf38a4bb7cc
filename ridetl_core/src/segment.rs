//! Splits a ride into segments wherever the recording has a time gap, then
//! resamples each segment onto a regular 1 second grid.

use anyhow::{bail, Result};
use log::debug;
use logging_timer::time;
use time::Duration;

use crate::{
    model::RideSample,
    partition::apply_partitioned,
    series::{cumulative_sum, lerp},
};

/// The assumed sampling period of the very first sample, which has no
/// predecessor to measure a gap against.
pub const NOMINAL_SAMPLE_PERIOD_SECONDS: f64 = 1.0;

/// Turns a raw, irregularly sampled series into a segmented series sampled
/// at 1 Hz.
#[derive(Debug, Clone)]
pub struct Segmenter {
    gap_threshold_seconds: f64,
}

impl Segmenter {
    pub fn new(gap_threshold_seconds: f64) -> Self {
        Self {
            gap_threshold_seconds,
        }
    }

    /// Runs the full segmentation: dedupe, gap detection, segment ids,
    /// resampling and per-segment timing.
    pub fn run(&self, samples: Vec<RideSample>) -> Result<Vec<RideSample>> {
        let mut samples = deduplicate_timestamps(samples)?;
        if samples.is_empty() {
            return Ok(samples);
        }

        compute_delta_time(&mut samples, NOMINAL_SAMPLE_PERIOD_SECONDS);
        compute_elapsed_time(&mut samples);
        let segment_count = assign_segment_ids(&mut samples, self.gap_threshold_seconds);
        debug!(
            "Found {segment_count} segments in {} samples (gap threshold {}s)",
            samples.len(),
            self.gap_threshold_seconds
        );

        // The raw gaps have done their job. The real per-segment values are
        // calculated after resampling.
        for s in &mut samples {
            s.delta_time = f64::NAN;
        }

        resample_segments(samples)
    }
}

/// Removes samples whose timestamp equals that of the sample before, keeping
/// the first. Timestamps that go backwards mean the input is corrupt.
pub fn deduplicate_timestamps(samples: Vec<RideSample>) -> Result<Vec<RideSample>> {
    let mut result: Vec<RideSample> = Vec::with_capacity(samples.len());

    for (idx, sample) in samples.into_iter().enumerate() {
        if let Some(prev) = result.last() {
            if sample.time < prev.time {
                bail!(
                    "Timestamps are not in order: sample {idx} at {} is earlier than {}",
                    sample.time,
                    prev.time
                );
            }

            if sample.time == prev.time {
                continue;
            }
        }

        result.push(sample);
    }

    Ok(result)
}

/// Sets `delta_time` to the seconds since the previous sample. The first
/// sample gets `fill_first`.
pub fn compute_delta_time(samples: &mut [RideSample], fill_first: f64) {
    for idx in 0..samples.len() {
        samples[idx].delta_time = if idx == 0 {
            fill_first
        } else {
            (samples[idx].time - samples[idx - 1].time).as_seconds_f64()
        };
    }
}

/// Sets `elapsed_time` to the running total of `delta_time`.
pub fn compute_elapsed_time(samples: &mut [RideSample]) {
    let deltas: Vec<f64> = samples.iter().map(|s| s.delta_time).collect();
    for (s, elapsed) in samples.iter_mut().zip(cumulative_sum(&deltas)) {
        s.elapsed_time = elapsed;
    }
}

/// Numbers the segments. The first sample is in segment 0 and any sample
/// whose `delta_time` is at least `gap_threshold_seconds` starts the next one.
/// Returns the number of segments.
pub fn assign_segment_ids(samples: &mut [RideSample], gap_threshold_seconds: f64) -> usize {
    if samples.is_empty() {
        return 0;
    }

    let mut segment_id = 0;
    samples[0].segment_id = 0;
    for s in samples.iter_mut().skip(1) {
        if s.delta_time >= gap_threshold_seconds {
            segment_id += 1;
        }
        s.segment_id = segment_id;
    }

    segment_id + 1
}

/// Resamples every segment independently and then calculates the
/// per-segment `delta_time` and `moving_time`.
#[time]
fn resample_segments(samples: Vec<RideSample>) -> Result<Vec<RideSample>> {
    let input_count = samples.len();

    let resampled = apply_partitioned(
        samples,
        |s: &RideSample| s.segment_id,
        |s: &RideSample| s.time,
        |segment| {
            let mut segment = resample_segment(segment)?;
            recompute_segment_timing(&mut segment);
            Ok(segment)
        },
    )?;

    debug!(
        "Resampled {input_count} samples to {} samples at 1Hz",
        resampled.len()
    );
    Ok(resampled)
}

/// Resamples a single segment onto a grid of whole seconds starting at the
/// first sample's time. Position, elevation and elapsed time are linearly
/// interpolated between the real samples either side of each grid point.
/// The grid never extends before the first or after the last real sample,
/// so a last sample that falls between whole seconds is not emitted itself:
/// samples at 0.0 s and 0.6 s give a single row at 0 s.
pub fn resample_segment(segment: Vec<RideSample>) -> Result<Vec<RideSample>> {
    if segment.len() < 2 {
        return Ok(segment);
    }

    let start = segment[0].time;
    let offsets: Vec<f64> = segment
        .iter()
        .map(|s| (s.time - start).as_seconds_f64())
        .collect();

    for idx in 1..offsets.len() {
        if offsets[idx] <= offsets[idx - 1] {
            bail!(
                "Segment {} is not strictly increasing in time at {}",
                segment[idx].segment_id,
                segment[idx].time
            );
        }
    }

    let last_offset = offsets[offsets.len() - 1];
    let len = last_offset.floor() as usize + 1;
    let mut result = Vec::with_capacity(len);
    let mut idx = 0;

    for step in 0..len {
        let target = step as f64;
        while idx + 1 < segment.len() && offsets[idx + 1] <= target {
            idx += 1;
        }

        let mut sample = segment[idx].clone();
        sample.time = start + Duration::seconds(step as i64);

        if idx + 1 < segment.len() {
            let next = &segment[idx + 1];
            let fraction = (target - offsets[idx]) / (offsets[idx + 1] - offsets[idx]);
            sample.lat = lerp(segment[idx].lat, next.lat, fraction);
            sample.lon = lerp(segment[idx].lon, next.lon, fraction);
            sample.ele = lerp(segment[idx].ele, next.ele, fraction);
            sample.elapsed_time = lerp(segment[idx].elapsed_time, next.elapsed_time, fraction);
        }

        result.push(sample);
    }

    Ok(result)
}

/// Recalculates `delta_time` within one segment (the first sample gets the
/// nominal period) and makes `moving_time` its running total.
pub fn recompute_segment_timing(segment: &mut [RideSample]) {
    compute_delta_time(segment, NOMINAL_SAMPLE_PERIOD_SECONDS);
    let deltas: Vec<f64> = segment.iter().map(|s| s.delta_time).collect();
    for (s, moving) in segment.iter_mut().zip(cumulative_sum(&deltas)) {
        s.moving_time = moving;
    }
}

#[cfg(test)]
mod tests {
    use time::{macros::datetime, OffsetDateTime};

    use super::*;

    const T0: OffsetDateTime = datetime!(2024-06-01 08:00:00 UTC);

    fn sample_at(seconds: f64, lat: f64) -> RideSample {
        let t = T0 + Duration::seconds_f64(seconds);
        RideSample::new(t, lat, -1.0, 100.0)
    }

    fn samples_at(seconds: &[f64]) -> Vec<RideSample> {
        seconds
            .iter()
            .enumerate()
            .map(|(i, &s)| sample_at(s, 50.0 + i as f64 * 0.001))
            .collect()
    }

    #[test]
    fn test_deduplicate_keeps_first_occurrence() {
        let mut samples = samples_at(&[0.0, 1.0, 1.0, 2.0]);
        samples[2].lat = 99.0;
        let result = deduplicate_timestamps(samples).unwrap();
        assert_eq!(result.len(), 3);
        assert!(result.iter().all(|s| s.lat != 99.0));
    }

    #[test]
    fn test_deduplicate_rejects_backwards_time() {
        let samples = samples_at(&[0.0, 5.0, 3.0]);
        assert!(deduplicate_timestamps(samples).is_err());
    }

    #[test]
    fn test_delta_time_first_sample_is_nominal() {
        let mut samples = samples_at(&[0.0, 2.0, 5.0]);
        compute_delta_time(&mut samples, NOMINAL_SAMPLE_PERIOD_SECONDS);
        compute_elapsed_time(&mut samples);
        let deltas: Vec<f64> = samples.iter().map(|s| s.delta_time).collect();
        let elapsed: Vec<f64> = samples.iter().map(|s| s.elapsed_time).collect();
        assert_eq!(deltas, vec![1.0, 2.0, 3.0]);
        assert_eq!(elapsed, vec![1.0, 3.0, 6.0]);
    }

    #[test]
    fn test_segment_ids_split_on_gap() {
        let mut samples = samples_at(&[0.0, 5.0, 10.0, 30.0, 35.0]);
        compute_delta_time(&mut samples, NOMINAL_SAMPLE_PERIOD_SECONDS);
        let count = assign_segment_ids(&mut samples, 15.0);
        let ids: Vec<usize> = samples.iter().map(|s| s.segment_id).collect();
        assert_eq!(ids, vec![0, 0, 0, 1, 1]);
        assert_eq!(count, 2);
    }

    #[test]
    fn test_segment_ids_gap_equal_to_threshold_splits() {
        let mut samples = samples_at(&[0.0, 15.0, 29.0]);
        compute_delta_time(&mut samples, NOMINAL_SAMPLE_PERIOD_SECONDS);
        assign_segment_ids(&mut samples, 15.0);
        let ids: Vec<usize> = samples.iter().map(|s| s.segment_id).collect();
        assert_eq!(ids, vec![0, 1, 1]);
    }

    #[test]
    fn test_segment_ids_all_small_gaps_single_segment() {
        let mut samples = samples_at(&[0.0, 3.0, 7.0, 14.0, 20.0]);
        compute_delta_time(&mut samples, NOMINAL_SAMPLE_PERIOD_SECONDS);
        assert_eq!(assign_segment_ids(&mut samples, 15.0), 1);
        assert!(samples.iter().all(|s| s.segment_id == 0));
    }

    #[test]
    fn test_zero_gap_threshold_gives_one_segment_per_sample() {
        let mut samples = samples_at(&[0.0, 1.0, 2.0, 3.0]);
        compute_delta_time(&mut samples, NOMINAL_SAMPLE_PERIOD_SECONDS);
        assert_eq!(assign_segment_ids(&mut samples, 0.0), 4);
        let ids: Vec<usize> = samples.iter().map(|s| s.segment_id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_resample_segment_fills_one_second_grid() {
        let mut segment = samples_at(&[0.0, 4.0]);
        segment[0].lat = 50.0;
        segment[1].lat = 50.004;
        segment[0].elapsed_time = 1.0;
        segment[1].elapsed_time = 5.0;

        let result = resample_segment(segment).unwrap();
        assert_eq!(result.len(), 5);
        assert_eq!(result[0].time, T0);
        for (i, s) in result.iter().enumerate() {
            assert_eq!(s.time, T0 + Duration::seconds(i as i64));
            assert!((s.lat - (50.0 + 0.001 * i as f64)).abs() < 1e-9);
            assert!((s.elapsed_time - (1.0 + i as f64)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_resample_segment_starts_at_first_real_sample() {
        let segment = samples_at(&[0.5, 2.0, 3.7]);
        let first = segment[0].time;
        let result = resample_segment(segment).unwrap();
        assert_eq!(result[0].time, first);
        for pair in result.windows(2) {
            assert_eq!(pair[1].time - pair[0].time, Duration::SECOND);
        }
    }

    #[test]
    fn test_resample_drops_fractional_last_sample() {
        let segment = samples_at(&[0.0, 0.6]);
        let first_lat = segment[0].lat;
        let result = resample_segment(segment).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].time, T0);
        assert_eq!(result[0].lat, first_lat);

        let mut segment = samples_at(&[0.0, 1.0, 2.6]);
        segment[1].lat = 50.0;
        segment[2].lat = 50.016;
        let result = resample_segment(segment).unwrap();
        assert_eq!(result.len(), 3);
        assert_eq!(result[2].time, T0 + Duration::seconds(2));
        // Interpolated 1/1.6 of the way from the 1.0 s sample to the 2.6 s one.
        assert!((result[2].lat - 50.01).abs() < 1e-9);
    }

    #[test]
    fn test_resample_single_sample_is_unchanged() {
        let segment = samples_at(&[0.0]);
        let result = resample_segment(segment).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].time, T0);
    }

    #[test]
    fn test_run_resamples_each_segment_independently() {
        let samples = samples_at(&[0.0, 2.0, 4.0, 30.0, 33.0]);
        let result = Segmenter::new(15.0).run(samples).unwrap();

        let seg0: Vec<&RideSample> = result.iter().filter(|s| s.segment_id == 0).collect();
        let seg1: Vec<&RideSample> = result.iter().filter(|s| s.segment_id == 1).collect();
        assert_eq!(seg0.len(), 5);
        assert_eq!(seg1.len(), 4);
        assert_eq!(seg1[0].time, T0 + Duration::seconds(30));

        // Timing restarts at the segment boundary.
        assert_eq!(seg0[0].delta_time, 1.0);
        assert_eq!(seg1[0].delta_time, 1.0);
        assert_eq!(seg1[0].moving_time, 1.0);
        assert_eq!(seg1[3].moving_time, 4.0);
        assert_eq!(seg0[4].moving_time, 5.0);

        // Output is sorted by time.
        for pair in result.windows(2) {
            assert!(pair[0].time < pair[1].time);
        }
    }

    #[test]
    fn test_run_on_empty_input() {
        let result = Segmenter::new(15.0).run(Vec::new()).unwrap();
        assert!(result.is_empty());
    }
}
