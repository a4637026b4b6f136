//! # Suitability Window Finder
//!
//! The heart of the engine: given the daytime observations for one spot and a
//! subscriber's preference rule, find every run of `min_run_length`
//! consecutive observations that all satisfy the rule and stay within one
//! local calendar day.
//!
//! ## Contiguity
//! A run is `min_run_length` consecutive positions in the observation slice
//! whose times also advance by exactly one hour per step. An hour dropped
//! during normalization therefore breaks every run that would otherwise span
//! it. The same-day check keeps a run from bridging two days.
//!
//! ## Overlap
//! Every qualifying start position is reported. Five viable hours with a run
//! length of four yield two overlapping windows; callers that only care about
//! existence check `is_empty()`.

use crate::direction::{classify, Direction};
use crate::{HourlyObservation, SuitabilityWindow};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Default number of consecutive hours a window must span.
pub const DEFAULT_MIN_RUN_LENGTH: usize = 4;

/// Reasons a preference rule is rejected at construction.
#[derive(Error, Debug, PartialEq)]
pub enum RuleError {
    #[error("wind speed bounds must be finite numbers")]
    NonFiniteSpeed,

    #[error("wind speed max ({max}) must be greater than min ({min})")]
    InvertedSpeedRange { min: f64, max: f64 },

    #[error("minimum temperature must be a finite number")]
    NonFiniteTemperature,

    #[error("at least one wind direction must be allowed")]
    NoDirections,
}

/// A subscriber's wind preferences. Read-only to the engine.
///
/// Both speed bounds are inclusive. When `min_temperature` is `None` the
/// temperature is not checked at all.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PreferenceRule {
    pub wind_speed_min: f64,
    pub wind_speed_max: f64,
    pub allowed_directions: BTreeSet<Direction>,
    #[serde(default)]
    pub min_temperature: Option<f64>,
}

impl PreferenceRule {
    /// Create a validated rule.
    pub fn new(
        wind_speed_min: f64,
        wind_speed_max: f64,
        allowed_directions: impl IntoIterator<Item = Direction>,
        min_temperature: Option<f64>,
    ) -> Result<Self, RuleError> {
        let rule = Self {
            wind_speed_min,
            wind_speed_max,
            allowed_directions: allowed_directions.into_iter().collect(),
            min_temperature,
        };
        rule.validate()?;
        Ok(rule)
    }

    /// Check the invariants `new` enforces; used for rules loaded from a store.
    pub fn validate(&self) -> Result<(), RuleError> {
        if !self.wind_speed_min.is_finite() || !self.wind_speed_max.is_finite() {
            return Err(RuleError::NonFiniteSpeed);
        }
        if self.wind_speed_max <= self.wind_speed_min {
            return Err(RuleError::InvertedSpeedRange {
                min: self.wind_speed_min,
                max: self.wind_speed_max,
            });
        }
        if self.min_temperature.is_some_and(|t| !t.is_finite()) {
            return Err(RuleError::NonFiniteTemperature);
        }
        if self.allowed_directions.is_empty() {
            return Err(RuleError::NoDirections);
        }
        Ok(())
    }

    /// The same rule with temperature filtering switched off.
    pub fn without_temperature(&self) -> Self {
        Self {
            min_temperature: None,
            ..self.clone()
        }
    }

    /// Whether a single observation satisfies every field of the rule.
    pub fn accepts(&self, obs: &HourlyObservation) -> bool {
        let speed_ok =
            self.wind_speed_min <= obs.wind_speed && obs.wind_speed <= self.wind_speed_max;
        if !speed_ok {
            return false;
        }

        if !self
            .allowed_directions
            .contains(&classify(obs.wind_direction_degrees))
        {
            return false;
        }

        match (self.min_temperature, obs.temperature) {
            (None, _) => true,
            (Some(min), Some(temp)) => temp >= min,
            (Some(_), None) => false,
        }
    }
}

/// Per-position viability of `obs` under `rule`, ignoring run length.
pub fn viable_hours(obs: &[HourlyObservation], rule: &PreferenceRule) -> Vec<bool> {
    obs.iter().map(|o| rule.accepts(o)).collect()
}

/// Find every window of `min_run_length` consecutive observations that satisfy
/// `rule`, follow each other hour by hour and share the local calendar date of
/// their first hour.
///
/// Returns an empty vector when nothing qualifies, when `min_run_length` is
/// zero, or when there are fewer observations than `min_run_length`.
///
/// # Example
/// ```
/// use chrono::{FixedOffset, TimeZone};
/// use spotter_lib::direction::Direction;
/// use spotter_lib::window::{find_windows, PreferenceRule};
/// use spotter_lib::HourlyObservation;
///
/// let utc = FixedOffset::east_opt(0).unwrap();
/// let obs: Vec<_> = [15.0, 16.0, 17.0, 18.0, 12.0]
///     .iter()
///     .enumerate()
///     .map(|(i, &speed)| HourlyObservation {
///         time: utc.with_ymd_and_hms(2025, 6, 14, 10 + i as u32, 0, 0).unwrap(),
///         wind_speed: speed,
///         wind_direction_degrees: 0.0,
///         temperature: None,
///     })
///     .collect();
///
/// let rule = PreferenceRule::new(10.0, 20.0, [Direction::N], None).unwrap();
/// assert_eq!(find_windows(&obs, &rule, 4).len(), 2);
/// ```
pub fn find_windows(
    obs: &[HourlyObservation],
    rule: &PreferenceRule,
    min_run_length: usize,
) -> Vec<SuitabilityWindow> {
    if min_run_length == 0 || obs.len() < min_run_length {
        return Vec::new();
    }

    let viable = viable_hours(obs, rule);

    obs.windows(min_run_length)
        .zip(viable.windows(min_run_length))
        .filter(|(run, ok)| ok.iter().all(|&v| v) && is_hourly(run) && same_local_day(run))
        .filter_map(|(run, _)| SuitabilityWindow::from_hours(run))
        .collect()
}

/// Neighbouring observations in `run` are exactly one hour apart, so an hour
/// dropped during normalization breaks the run instead of being bridged.
fn is_hourly(run: &[HourlyObservation]) -> bool {
    run.windows(2)
        .all(|pair| pair[1].time - pair[0].time == Duration::hours(1))
}

/// All observations in `run` fall on the local date of the first one.
fn same_local_day(run: &[HourlyObservation]) -> bool {
    let Some(first) = run.first() else {
        return true;
    };
    let day = first.time.date_naive();
    run.iter().skip(1).all(|o| o.time.date_naive() == day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    fn series(speeds: &[f64], direction: f64) -> Vec<HourlyObservation> {
        let utc = FixedOffset::east_opt(0).unwrap();
        let start = utc.with_ymd_and_hms(2025, 6, 14, 9, 0, 0).unwrap();
        speeds
            .iter()
            .enumerate()
            .map(|(i, &speed)| HourlyObservation {
                time: start + Duration::hours(i as i64),
                wind_speed: speed,
                wind_direction_degrees: direction,
                temperature: Some(15.0),
            })
            .collect()
    }

    fn north_rule() -> PreferenceRule {
        PreferenceRule::new(10.0, 20.0, [Direction::N], None).unwrap()
    }

    #[test]
    fn test_rule_validation() {
        assert_eq!(
            PreferenceRule::new(20.0, 10.0, [Direction::N], None),
            Err(RuleError::InvertedSpeedRange { min: 20.0, max: 10.0 })
        );
        assert_eq!(
            PreferenceRule::new(10.0, 10.0, [Direction::N], None).unwrap_err(),
            RuleError::InvertedSpeedRange { min: 10.0, max: 10.0 }
        );
        assert_eq!(
            PreferenceRule::new(10.0, 20.0, std::iter::empty(), None),
            Err(RuleError::NoDirections)
        );
        assert_eq!(
            PreferenceRule::new(f64::NAN, 20.0, [Direction::N], None),
            Err(RuleError::NonFiniteSpeed)
        );
    }

    #[test]
    fn test_speed_bounds_are_inclusive() {
        let rule = north_rule();
        let obs = series(&[10.0, 20.0, 9.99, 20.01], 0.0);
        assert_eq!(viable_hours(&obs, &rule), vec![true, true, false, false]);
    }

    #[test]
    fn test_direction_must_be_allowed() {
        let rule = PreferenceRule::new(10.0, 20.0, [Direction::W, Direction::WSW], None).unwrap();
        let west = series(&[15.0; 4], 265.0);
        let north = series(&[15.0; 4], 5.0);
        assert_eq!(find_windows(&west, &rule, 4).len(), 1);
        assert!(find_windows(&north, &rule, 4).is_empty());
    }

    #[test]
    fn test_temperature_floor_inclusive_and_optional() {
        let mut obs = series(&[15.0; 4], 0.0);
        obs[2].temperature = Some(8.0);

        let warm = PreferenceRule::new(10.0, 20.0, [Direction::N], Some(8.0)).unwrap();
        assert_eq!(find_windows(&obs, &warm, 4).len(), 1);

        let warmer = PreferenceRule::new(10.0, 20.0, [Direction::N], Some(8.5)).unwrap();
        assert!(find_windows(&obs, &warmer, 4).is_empty());
        assert_eq!(find_windows(&obs, &warmer.without_temperature(), 4).len(), 1);
    }

    #[test]
    fn test_missing_temperature_fails_when_rule_needs_it() {
        let mut obs = series(&[15.0; 4], 0.0);
        obs[0].temperature = None;
        let rule = PreferenceRule::new(10.0, 20.0, [Direction::N], Some(0.0)).unwrap();
        assert!(find_windows(&obs, &rule, 4).is_empty());
    }

    #[test]
    fn test_overlapping_windows_all_reported() {
        let obs = series(&[15.0; 6], 0.0);
        let windows = find_windows(&obs, &north_rule(), 4);
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[1].start_hour, obs[1].time);
        assert_eq!(windows[1].end_hour_exclusive, obs[4].time + Duration::hours(1));
        assert!(windows.iter().all(|w| w.hours.len() == 4));
    }

    #[test]
    fn test_run_crossing_midnight_is_rejected() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let start = utc.with_ymd_and_hms(2025, 6, 14, 21, 0, 0).unwrap();
        let obs: Vec<_> = (0..4)
            .map(|i| HourlyObservation {
                time: start + Duration::hours(i),
                wind_speed: 15.0,
                wind_direction_degrees: 0.0,
                temperature: None,
            })
            .collect();
        assert!(find_windows(&obs, &north_rule(), 4).is_empty());
        assert_eq!(find_windows(&obs, &north_rule(), 3).len(), 1);
    }

    #[test]
    fn test_no_window_spans_a_gap() {
        let obs = series(&[15.0, 15.0, 25.0, 15.0, 15.0, 15.0, 15.0], 0.0);
        let windows = find_windows(&obs, &north_rule(), 4);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].start_hour, obs[3].time);
    }

    #[test]
    fn test_dropped_hour_breaks_the_run() {
        let mut obs = series(&[15.0; 6], 0.0);
        obs.remove(2);

        // 09 10 | 12 13 14: four positions around the hole, but five clock hours
        assert!(find_windows(&obs, &north_rule(), 4).is_empty());

        let windows = find_windows(&obs, &north_rule(), 3);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].start_hour, obs[2].time);
        assert_eq!(
            windows[0].end_hour_exclusive - windows[0].start_hour,
            Duration::hours(3)
        );
    }

    #[test]
    fn test_degenerate_run_lengths() {
        let obs = series(&[15.0; 3], 0.0);
        assert!(find_windows(&obs, &north_rule(), 0).is_empty());
        assert!(find_windows(&obs, &north_rule(), 4).is_empty());
        assert!(find_windows(&[], &north_rule(), 1).is_empty());
        assert_eq!(find_windows(&obs, &north_rule(), 1).len(), 3);
    }

    #[test]
    fn test_window_speed_range() {
        let obs = series(&[12.0, 18.0, 15.0, 11.0], 0.0);
        let windows = find_windows(&obs, &north_rule(), 4);
        assert_eq!(windows[0].speed_range(), (11.0, 18.0));
    }
}
