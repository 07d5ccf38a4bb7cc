use anyhow::{bail, Context, Result};
use time::{macros::date, Date, Duration, OffsetDateTime, Time};

/// These are the parameters that control the pipeline. They are supplied by
/// the caller (normally built from the command line) and validated when the
/// pipeline is constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineParameters {
    /// A gap between two samples of at least this many seconds starts a new
    /// segment.
    pub gap_threshold_seconds: f64,

    /// Thresholds for the cruise-state detection.
    pub cruise: CruiseThresholds,

    /// The number of samples in the smoothing window of the signal filter.
    pub filter_order: usize,

    /// Defines the calendar training windows.
    pub training: TrainingWindowParameters,
}

/// The two thresholds of the cruise-state hysteresis, in mph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CruiseThresholds {
    /// You start cruising the first time your speed reaches this.
    pub upper_mph: f64,

    /// You stop cruising the first time your speed drops below this.
    pub lower_mph: f64,
}

/// The training windows are fixed-length calendar buckets, starting at
/// `epoch` (midnight UTC).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingWindowParameters {
    pub epoch: Date,
    pub period_weeks: u32,
    /// How many window boundaries to generate.
    pub window_count: usize,
}

impl Default for PipelineParameters {
    fn default() -> Self {
        Self {
            gap_threshold_seconds: 15.0,
            cruise: CruiseThresholds::default(),
            filter_order: 10,
            training: TrainingWindowParameters::default(),
        }
    }
}

impl Default for CruiseThresholds {
    fn default() -> Self {
        Self {
            upper_mph: 8.0,
            lower_mph: 5.0,
        }
    }
}

impl Default for TrainingWindowParameters {
    fn default() -> Self {
        Self {
            epoch: date!(2019-01-07),
            period_weeks: 8,
            window_count: 130,
        }
    }
}

impl PipelineParameters {
    /// Checks the parameters make sense together.
    pub fn validate(&self) -> Result<()> {
        if !self.gap_threshold_seconds.is_finite() || self.gap_threshold_seconds < 0.0 {
            bail!(
                "gap threshold must be a non-negative number of seconds, got {}",
                self.gap_threshold_seconds
            );
        }

        self.cruise.validate()?;

        if self.filter_order == 0 {
            bail!("filter order must be at least 1");
        }

        self.training.validate()
    }
}

impl CruiseThresholds {
    pub fn validate(&self) -> Result<()> {
        if !self.upper_mph.is_finite() || !self.lower_mph.is_finite() {
            bail!("cruise thresholds must be finite, got {:?}", self);
        }

        if self.lower_mph > self.upper_mph {
            bail!(
                "lower cruise threshold ({}) is above the upper threshold ({})",
                self.lower_mph,
                self.upper_mph
            );
        }

        Ok(())
    }
}

impl TrainingWindowParameters {
    pub fn validate(&self) -> Result<()> {
        if self.period_weeks == 0 {
            bail!("training window period must be at least 1 week");
        }

        if self.window_count == 0 {
            bail!("at least one training window is required");
        }

        self.window_start(self.window_count - 1)
            .context("too many training windows for the period")?;

        Ok(())
    }

    /// Returns the start of window `index`: midnight UTC on the epoch plus
    /// `index` periods. Fails if that lies outside the representable range.
    pub fn window_start(&self, index: usize) -> Result<OffsetDateTime> {
        let start = self.epoch.with_time(Time::MIDNIGHT).assume_utc();
        let steps = i32::try_from(index)
            .with_context(|| format!("training window {index} is too far from the epoch"))?;

        Duration::weeks(i64::from(self.period_weeks))
            .checked_mul(steps)
            .and_then(|offset| start.checked_add(offset))
            .with_context(|| format!("training window {index} starts outside the supported date range"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let params = PipelineParameters::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.gap_threshold_seconds, 15.0);
        assert_eq!(params.cruise.upper_mph, 8.0);
        assert_eq!(params.cruise.lower_mph, 5.0);
        assert_eq!(params.filter_order, 10);
        assert_eq!(params.training.period_weeks, 8);
    }

    #[test]
    fn test_zero_gap_threshold_is_allowed() {
        let params = PipelineParameters {
            gap_threshold_seconds: 0.0,
            ..Default::default()
        };
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_negative_gap_threshold_is_rejected() {
        let params = PipelineParameters {
            gap_threshold_seconds: -1.0,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_inverted_cruise_thresholds_are_rejected() {
        let params = PipelineParameters {
            cruise: CruiseThresholds {
                upper_mph: 4.0,
                lower_mph: 6.0,
            },
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_oversized_window_count_is_rejected() {
        let params = PipelineParameters {
            training: TrainingWindowParameters {
                window_count: 100_000,
                ..Default::default()
            },
            ..Default::default()
        };
        let err = params.validate().unwrap_err();
        assert!(format!("{err:#}").contains("too many training windows"));
    }

    #[test]
    fn test_window_count_beyond_i32_is_rejected() {
        let params = TrainingWindowParameters {
            period_weeks: 1,
            window_count: i32::MAX as usize + 2,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_huge_period_is_rejected() {
        let params = TrainingWindowParameters {
            period_weeks: u32::MAX,
            window_count: 2,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_window_start() {
        let params = TrainingWindowParameters::default();
        assert_eq!(
            params.window_start(0).unwrap(),
            time::macros::datetime!(2019-01-07 00:00:00 UTC)
        );
        assert_eq!(
            params.window_start(2).unwrap(),
            time::macros::datetime!(2019-04-29 00:00:00 UTC)
        );
    }

    #[test]
    fn test_zero_filter_order_is_rejected() {
        let params = PipelineParameters {
            filter_order: 0,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }
}
