use std::path::PathBuf;

use time::OffsetDateTime;

/// A Ride is the ordered series of samples recorded during one ride. It starts
/// life holding just the raw observations (time, position, elevation) and each
/// stage of the pipeline fills in more of the derived fields on its samples.
#[derive(Debug, Clone)]
pub struct Ride {
    /// Identifies the ride. The GPX reader uses the file stem.
    pub ride_id: String,
    /// The file the ride was read from, if any. Handy for log messages and
    /// for working out where to write the output.
    pub filename: Option<PathBuf>,
    /// The samples, ordered by time.
    pub samples: Vec<RideSample>,
}

impl Ride {
    /// Creates a new Ride from raw samples.
    pub fn new<S: Into<String>>(ride_id: S, samples: Vec<RideSample>) -> Self {
        Self {
            ride_id: ride_id.into(),
            filename: None,
            samples,
        }
    }

    /// Returns the number of samples in the ride.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if the ride has no samples at all.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Returns the number of distinct segments in the ride. Only meaningful
    /// after segmentation.
    pub fn segment_count(&self) -> usize {
        let mut ids: Vec<usize> = self.samples.iter().map(|s| s.segment_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }
}

/// One observation from the GPS plus everything we derive from it.
///
/// The numeric derived fields start out as NaN, which means "not calculated
/// yet" before the relevant stage has run and "undefined" afterwards (for
/// example the distance of the first sample in a segment).
#[derive(Debug, Clone)]
pub struct RideSample {
    /// The time of the observation, in UTC.
    pub time: OffsetDateTime,
    /// The latitude, in degrees.
    pub lat: f64,
    /// The longitude, in degrees.
    pub lon: f64,
    /// The elevation. Metres as read, converted to feet by the enricher.
    pub ele: f64,

    // All the below fields are the 'derived' ones.
    /// The segment this sample belongs to. Dense, starting at 0.
    pub segment_id: usize,
    /// Seconds between this sample and the previous one.
    pub delta_time: f64,
    /// Running total of `delta_time` from the start of the ride, calculated
    /// before resampling.
    pub elapsed_time: f64,
    /// Running total of `delta_time` within the segment, calculated after
    /// resampling.
    pub moving_time: f64,
    /// Great-circle distance from the previous sample in the same segment,
    /// in miles.
    pub delta_dist: f64,
    /// Direction of travel from the previous sample, degrees in [0, 360).
    pub heading: f64,
    /// Instantaneous speed in mph.
    pub speed: f64,
    /// Whether the rider is in a sustained high speed state.
    pub is_cruising: bool,
    /// Change in elevation from the previous sample, in feet.
    pub delta_ele: f64,
    /// Slope in percent.
    pub grade: f64,
    /// Running total of climbing, in feet.
    pub elapsed_ascent: f64,
    /// Running total of descending (always positive), in feet.
    pub elapsed_descent: f64,
    /// `elapsed_ascent + elapsed_descent`.
    pub elapsed_elevation: f64,
    /// The calendar training window the sample falls into, if it falls on or
    /// after the first window.
    pub training_window_id: Option<usize>,
    /// Smoothed `speed`.
    pub filt_speed: f64,
    /// Smoothed `grade`.
    pub filt_grade: f64,
}

impl RideSample {
    /// Creates a sample from the raw observation. All derived fields are
    /// left unset.
    pub fn new(time: OffsetDateTime, lat: f64, lon: f64, ele: f64) -> Self {
        Self {
            time,
            lat,
            lon,
            ele,
            segment_id: 0,
            delta_time: f64::NAN,
            elapsed_time: f64::NAN,
            moving_time: f64::NAN,
            delta_dist: f64::NAN,
            heading: f64::NAN,
            speed: f64::NAN,
            is_cruising: false,
            delta_ele: f64::NAN,
            grade: f64::NAN,
            elapsed_ascent: f64::NAN,
            elapsed_descent: f64::NAN,
            elapsed_elevation: f64::NAN,
            training_window_id: None,
            filt_speed: f64::NAN,
            filt_grade: f64::NAN,
        }
    }
}
