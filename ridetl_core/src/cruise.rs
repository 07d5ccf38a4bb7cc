use crate::config::CruiseThresholds;

/// Whether the rider is holding a sustained high speed. Switching between
/// the two states uses different thresholds, so speeds hovering in the band
/// between them do not make the state flicker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CruiseState {
    #[default]
    NotCruising,
    Cruising,
}

impl CruiseState {
    /// Returns the state after observing `speed`. A NaN speed compares false
    /// against both thresholds and so leaves the state as it was.
    pub fn next(self, speed: f64, thresholds: &CruiseThresholds) -> Self {
        match self {
            CruiseState::NotCruising if speed >= thresholds.upper_mph => CruiseState::Cruising,
            CruiseState::Cruising if speed < thresholds.lower_mph => CruiseState::NotCruising,
            state => state,
        }
    }

    pub fn is_cruising(self) -> bool {
        self == CruiseState::Cruising
    }
}

/// Runs the state machine over a series of speeds. The first speed only sets
/// the starting point: the series always starts NotCruising.
pub fn cruise_states(speeds: &[f64], thresholds: &CruiseThresholds) -> Vec<CruiseState> {
    let mut states = Vec::with_capacity(speeds.len());
    let mut state = CruiseState::NotCruising;

    for (idx, &speed) in speeds.iter().enumerate() {
        if idx > 0 {
            state = state.next(speed, thresholds);
        }
        states.push(state);
    }

    states
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> CruiseThresholds {
        CruiseThresholds {
            upper_mph: 8.0,
            lower_mph: 5.0,
        }
    }

    #[test]
    fn test_transitions() {
        let t = thresholds();
        assert_eq!(CruiseState::NotCruising.next(8.0, &t), CruiseState::Cruising);
        assert_eq!(CruiseState::NotCruising.next(7.9, &t), CruiseState::NotCruising);
        assert_eq!(CruiseState::Cruising.next(5.0, &t), CruiseState::Cruising);
        assert_eq!(CruiseState::Cruising.next(4.9, &t), CruiseState::NotCruising);
        assert_eq!(CruiseState::Cruising.next(f64::NAN, &t), CruiseState::Cruising);
        assert_eq!(CruiseState::NotCruising.next(f64::NAN, &t), CruiseState::NotCruising);
    }

    #[test]
    fn test_hysteresis_sequence() {
        let speeds = [0.0, 9.0, 9.0, 4.0, 4.0, 9.0];
        let states: Vec<bool> = cruise_states(&speeds, &thresholds())
            .into_iter()
            .map(CruiseState::is_cruising)
            .collect();
        assert_eq!(states, vec![false, true, true, false, false, true]);
    }

    #[test]
    fn test_no_flicker_inside_band() {
        let speeds = [0.0, 9.0, 6.0, 7.5, 5.5, 6.0, 7.9];
        let states = cruise_states(&speeds, &thresholds());
        assert!(states[1..].iter().all(|s| s.is_cruising()));
    }

    #[test]
    fn test_first_sample_never_cruising() {
        let states = cruise_states(&[20.0, 20.0], &thresholds());
        assert_eq!(states, vec![CruiseState::NotCruising, CruiseState::Cruising]);
    }
}
