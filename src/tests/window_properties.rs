//! Property tests for the window finder: inclusive speed bounds, same-day
//! enforcement and exact run length.

use crate::direction::Direction;
use crate::window::{find_windows, PreferenceRule};
use crate::HourlyObservation;
use chrono::{Duration, FixedOffset, TimeZone};
use proptest::prelude::*;

/// `speeds.len()` hourly observations from north, starting at local
/// `start_hour` on 2025-06-14 in a zone `offset_hours` east of UTC.
fn series(speeds: &[f64], start_hour: u32, offset_hours: i32) -> Vec<HourlyObservation> {
    let zone = FixedOffset::east_opt(offset_hours * 3600).unwrap();
    let start = zone.with_ymd_and_hms(2025, 6, 14, start_hour, 0, 0).unwrap();
    speeds
        .iter()
        .enumerate()
        .map(|(i, &speed)| HourlyObservation {
            time: start + Duration::hours(i as i64),
            wind_speed: speed,
            wind_direction_degrees: 0.0,
            temperature: Some(15.0),
        })
        .collect()
}

fn rule(min: f64, max: f64) -> PreferenceRule {
    PreferenceRule::new(min, max, [Direction::N], None).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Speeds sitting exactly on either bound are viable.
    #[test]
    fn prop_bounds_are_inclusive(
        min in 0.0f64..40.0,
        width in 0.5f64..20.0,
        picks in prop::collection::vec(any::<bool>(), 4),
    ) {
        let max = min + width;
        let speeds: Vec<f64> = picks.iter().map(|&hi| if hi { max } else { min }).collect();
        let obs = series(&speeds, 10, 0);

        prop_assert_eq!(find_windows(&obs, &rule(min, max), 4).len(), 1);
    }

    /// One hour just outside the range kills every run that contains it.
    #[test]
    fn prop_out_of_range_hour_breaks_runs(
        min in 1.0f64..40.0,
        width in 0.5f64..20.0,
        excess in 0.01f64..5.0,
        above in any::<bool>(),
        position in 0usize..4,
    ) {
        let max = min + width;
        let mut speeds = vec![min; 4];
        speeds[position] = if above { max + excess } else { min - excess };
        let obs = series(&speeds, 10, 0);

        prop_assert!(find_windows(&obs, &rule(min, max), 4).is_empty());
    }

    /// Every window has exactly the requested length, stays on one local day
    /// and only holds hours the rule accepts.
    #[test]
    fn prop_windows_are_exact_same_day_and_viable(
        speeds in prop::collection::vec(5.0f64..30.0, 0..40),
        start_hour in 0u32..24,
        offset_hours in -11i32..14,
        run_length in 1usize..7,
    ) {
        let obs = series(&speeds, start_hour, offset_hours);
        let rule = rule(12.0, 24.0);

        for window in find_windows(&obs, &rule, run_length) {
            prop_assert_eq!(window.hours.len(), run_length);
            let day = window.start_hour.date_naive();
            prop_assert!(window.hours.iter().all(|h| h.time.date_naive() == day));
            prop_assert!(window.hours.iter().all(|h| rule.accepts(h)));
            prop_assert_eq!(window.end_hour_exclusive - window.start_hour, Duration::hours(run_length as i64));
        }
    }

    /// With every hour viable, the windows are exactly the runs that do not
    /// cross local midnight.
    #[test]
    fn prop_all_viable_windows_stop_at_midnight(
        len in 0usize..40,
        start_hour in 0u32..24,
        run_length in 1usize..7,
    ) {
        let obs = series(&vec![15.0; len], start_hour, 2);
        let expected = (0..len)
            .filter(|&i| i + run_length <= len)
            .filter(|&i| obs[i].time.date_naive() == obs[i + run_length - 1].time.date_naive())
            .count();

        prop_assert_eq!(find_windows(&obs, &rule(10.0, 20.0), run_length).len(), expected);
    }

    /// Dropping arbitrary hours from an all-viable series never lets a window
    /// bridge the hole: each one still spans exactly `run_length` clock hours.
    #[test]
    fn prop_dropped_hours_are_never_bridged(
        keep in prop::collection::vec(any::<bool>(), 0..14),
        run_length in 1usize..6,
    ) {
        let full = series(&vec![15.0; keep.len()], 9, 2);
        let obs: Vec<HourlyObservation> = full
            .into_iter()
            .zip(&keep)
            .filter(|(_, kept)| **kept)
            .map(|(hour, _)| hour)
            .collect();

        let expected = (0..keep.len())
            .filter(|&i| i + run_length <= keep.len())
            .filter(|&i| keep[i..i + run_length].iter().all(|&k| k))
            .count();
        let windows = find_windows(&obs, &rule(10.0, 20.0), run_length);

        prop_assert_eq!(windows.len(), expected);
        for window in &windows {
            prop_assert_eq!(window.end_hour_exclusive - window.start_hour, Duration::hours(run_length as i64));
            prop_assert!(window.hours.windows(2).all(|pair| pair[1].time - pair[0].time == Duration::hours(1)));
        }
    }

    /// A run length longer than the series never yields a window.
    #[test]
    fn prop_run_longer_than_series_is_empty(len in 0usize..8, extra in 1usize..5) {
        let obs = series(&vec![15.0; len], 9, 0);
        prop_assert!(find_windows(&obs, &rule(10.0, 20.0), len + extra).is_empty());
    }
}
