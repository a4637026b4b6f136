//! Daytime filtering of hourly observations.

use crate::HourlyObservation;
use chrono::Timelike;
use serde::{Deserialize, Serialize};

/// Local time-of-day range an alert may cover.
///
/// The boundaries are deliberately asymmetric: an observation at local hour
/// `h` is kept when `start_hour_exclusive < h <= end_hour_inclusive`. With
/// the default 8/20 window the 08:00 hour is excluded and the 20:00 hour is
/// included, so the kept hours are 09:00 through 20:00.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaytimeWindow {
    pub start_hour_exclusive: u32,
    pub end_hour_inclusive: u32,
}

impl Default for DaytimeWindow {
    fn default() -> Self {
        Self {
            start_hour_exclusive: 8,
            end_hour_inclusive: 20,
        }
    }
}

impl DaytimeWindow {
    pub fn contains_hour(&self, hour: u32) -> bool {
        hour > self.start_hour_exclusive && hour <= self.end_hour_inclusive
    }

    /// Keep only observations inside this window; order is preserved.
    pub fn restrict(&self, obs: &[HourlyObservation]) -> Vec<HourlyObservation> {
        obs.iter()
            .filter(|o| self.contains_hour(o.time.hour()))
            .copied()
            .collect()
    }
}

/// Keep observations whose local hour is in `(start_hour_exclusive, end_hour_inclusive]`.
pub fn restrict_to_daytime(
    obs: &[HourlyObservation],
    start_hour_exclusive: u32,
    end_hour_inclusive: u32,
) -> Vec<HourlyObservation> {
    DaytimeWindow {
        start_hour_exclusive,
        end_hour_inclusive,
    }
    .restrict(obs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    fn full_day(offset_secs: i32) -> Vec<HourlyObservation> {
        let offset = FixedOffset::east_opt(offset_secs).unwrap();
        (0..24)
            .map(|h| HourlyObservation {
                time: offset.with_ymd_and_hms(2025, 6, 14, h, 0, 0).unwrap(),
                wind_speed: 12.0,
                wind_direction_degrees: 270.0,
                temperature: Some(18.0),
            })
            .collect()
    }

    #[test]
    fn test_default_window_is_nine_through_twenty() {
        let kept = restrict_to_daytime(&full_day(0), 8, 20);
        let hours: Vec<u32> = kept.iter().map(|o| o.time.hour()).collect();
        assert_eq!(hours, (9..=20).collect::<Vec<_>>());
    }

    #[test]
    fn test_start_boundary_excluded_end_boundary_included() {
        let window = DaytimeWindow::default();
        assert!(!window.contains_hour(8));
        assert!(window.contains_hour(9));
        assert!(window.contains_hour(20));
        assert!(!window.contains_hour(21));
    }

    #[test]
    fn test_uses_local_hour_not_utc() {
        // 10:00 at +05:00 is 05:00 UTC, still daytime locally
        let kept = restrict_to_daytime(&full_day(5 * 3600), 8, 20);
        assert_eq!(kept.first().map(|o| o.time.hour()), Some(9));
        assert_eq!(kept.len(), 12);
    }

    #[test]
    fn test_empty_and_inverted_windows() {
        assert!(restrict_to_daytime(&[], 8, 20).is_empty());
        assert!(restrict_to_daytime(&full_day(0), 20, 8).is_empty());
    }
}
