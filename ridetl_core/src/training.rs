use anyhow::{Context, Result};
use time::OffsetDateTime;

use crate::config::TrainingWindowParameters;

/// A table of training window start times. Window `i` runs from
/// `boundaries[i]` up to (but not including) `boundaries[i + 1]`; the last
/// window is open ended.
#[derive(Debug, Clone)]
pub struct TrainingWindows {
    boundaries: Vec<OffsetDateTime>,
}

impl TrainingWindows {
    /// Generates the window boundaries, starting at midnight UTC on the epoch
    /// date and stepping by the period.
    pub fn new(params: &TrainingWindowParameters) -> Result<Self> {
        let boundaries = (0..params.window_count)
            .map(|i| params.window_start(i))
            .collect::<Result<Vec<_>>>()
            .context("Cannot build the training windows")?;

        Ok(Self { boundaries })
    }

    /// Returns the index of the latest window that starts at or before
    /// `time`, or None if `time` is before the first window.
    pub fn window_id(&self, time: OffsetDateTime) -> Option<usize> {
        // partition_point gives the number of boundaries <= time.
        let count = self.boundaries.partition_point(|b| *b <= time);
        count.checked_sub(1)
    }
}
