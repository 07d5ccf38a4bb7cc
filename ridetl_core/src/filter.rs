//! Smoothing of the noisy derived signals (speed and grade).

use anyhow::Result;
use log::debug;
use logging_timer::time;

use crate::{model::RideSample, partition::apply_partitioned};

/// Smooths `speed` and `grade` within each segment using a Hann-shaped
/// moving average. The raw values are kept alongside the smoothed ones.
#[derive(Debug, Clone)]
pub struct SignalFilter {
    window: Vec<f64>,
}

impl SignalFilter {
    /// Creates a filter whose window spans `order` samples.
    pub fn new(order: usize) -> Self {
        Self {
            window: hann_window(order),
        }
    }

    pub fn order(&self) -> usize {
        self.window.len()
    }

    pub fn run(&self, samples: Vec<RideSample>) -> Result<Vec<RideSample>> {
        debug!("Filtering speed and grade with a window of {} samples", self.order());
        filter_segments(samples, &self.window)
    }
}

#[time]
fn filter_segments(samples: Vec<RideSample>, window: &[f64]) -> Result<Vec<RideSample>> {
    apply_partitioned(
        samples,
        |s: &RideSample| s.segment_id,
        |s: &RideSample| s.time,
        |mut segment| {
            let speeds: Vec<f64> = segment.iter().map(|s| s.speed).collect();
            let grades: Vec<f64> = segment.iter().map(|s| s.grade).collect();
            let filt_speeds = filter_signal(&speeds, window);
            let filt_grades = filter_signal(&grades, window);

            for (idx, s) in segment.iter_mut().enumerate() {
                s.filt_speed = filt_speeds[idx];
                s.filt_grade = filt_grades[idx];
            }

            Ok(segment)
        },
    )
}

/// Returns a symmetric Hann-shaped window of `order` weights. The zero-valued
/// end points of the textbook window are left out, so every weight is
/// positive and even a window of 1 or 2 samples is usable.
pub fn hann_window(order: usize) -> Vec<f64> {
    let denominator = (order + 1) as f64;
    (0..order)
        .map(|n| 0.5 - 0.5 * (2.0 * std::f64::consts::PI * (n + 1) as f64 / denominator).cos())
        .collect()
}

/// Filters `signal` with `window` and guarantees the output is the same length
/// as the input. A signal of one sample is returned unchanged.
pub fn filter_signal(signal: &[f64], window: &[f64]) -> Vec<f64> {
    if signal.len() < 2 || window.is_empty() {
        return signal.to_vec();
    }

    fit_to_length(convolve(signal, window), signal.len())
}

/// Weighted moving average of `signal`. Near the ends only part of the window
/// overlaps the signal, and the average is taken over the weight that does.
/// Non-finite samples carry no weight; if nothing in the window is usable the
/// output is NaN.
///
/// An odd window is centred on each sample, giving one output per sample. An
/// even window has no middle weight, so it is centred halfway between each
/// sample and its predecessor; that gives one output fewer, for samples
/// `1..len`.
pub fn convolve(signal: &[f64], window: &[f64]) -> Vec<f64> {
    let order = window.len();
    let (half, first) = if order % 2 == 1 {
        ((order - 1) / 2, 0)
    } else {
        (order / 2, 1)
    };

    (first..signal.len())
        .map(|centre| {
            let mut total = 0.0;
            let mut weight = 0.0;

            for (j, w) in window.iter().enumerate() {
                let Some(idx) = (centre + j).checked_sub(half) else {
                    continue;
                };

                if let Some(&value) = signal.get(idx) {
                    if value.is_finite() {
                        total += w * value;
                        weight += w;
                    }
                }
            }

            if weight > 0.0 {
                total / weight
            } else {
                f64::NAN
            }
        })
        .collect()
}

/// Pads a filtered series that came out shorter than the signal by repeating
/// its first value at the front. Never truncates.
pub fn fit_to_length(mut filtered: Vec<f64>, len: usize) -> Vec<f64> {
    while filtered.len() < len {
        let Some(&first) = filtered.first() else {
            filtered.resize(len, f64::NAN);
            break;
        };
        filtered.insert(0, first);
    }

    filtered
}
