//! # Hourly Record Normalization
//!
//! Forecast providers hand back hourly data column by column: one array of
//! timestamps and one array per variable, correlated only by index. This
//! module zips those columns into a single ordered `Vec<HourlyObservation>`
//! so nothing downstream depends on the provider's layout.
//!
//! ## Missing Data Policy
//! An hour is dropped entirely when any consumed field is missing:
//! - wind speed or wind direction is `None`, non-finite, or past the end of a
//!   shorter column
//! - temperature is missing while `require_temperature` is set
//!
//! Dropped hours leave a gap in the sequence. The window finder requires an
//! hourly step between neighbours, so a gap splits candidate windows rather
//! than failing the run. Zero is a real reading (calm wind, a northerly
//! bearing) and is never treated as missing.

use crate::HourlyObservation;
use chrono::{DateTime, FixedOffset};

/// Zip index-aligned forecast columns into complete hourly observations.
///
/// `times` defines the index space; value columns shorter than `times` are
/// treated as missing beyond their end, longer ones are truncated. When
/// `temperatures` is `None` no observation carries a temperature, and with
/// `require_temperature` set every hour is dropped.
///
/// # Example
/// ```
/// use chrono::{FixedOffset, TimeZone};
/// use spotter_lib::normalize::normalize;
///
/// let utc = FixedOffset::east_opt(0).unwrap();
/// let times: Vec<_> = (9..12)
///     .map(|h| utc.with_ymd_and_hms(2025, 6, 14, h, 0, 0).unwrap())
///     .collect();
/// let speeds = [Some(14.0), None, Some(16.0)];
/// let directions = [Some(270.0), Some(275.0), Some(280.0)];
///
/// let obs = normalize(&times, &speeds, &directions, None, false);
/// assert_eq!(obs.len(), 2);
/// ```
pub fn normalize(
    times: &[DateTime<FixedOffset>],
    speeds: &[Option<f64>],
    directions: &[Option<f64>],
    temperatures: Option<&[Option<f64>]>,
    require_temperature: bool,
) -> Vec<HourlyObservation> {
    let mut observations = Vec::with_capacity(times.len());

    for (idx, &time) in times.iter().enumerate() {
        let (Some(wind_speed), Some(wind_direction_degrees)) =
            (value_at(speeds, idx), value_at(directions, idx))
        else {
            continue;
        };

        let temperature = temperatures.and_then(|column| value_at(column, idx));
        if require_temperature && temperature.is_none() {
            continue;
        }

        observations.push(HourlyObservation {
            time,
            wind_speed,
            wind_direction_degrees,
            temperature,
        });
    }

    observations
}

/// Value at `idx`, or `None` when absent, out of range, or not a finite number.
fn value_at(column: &[Option<f64>], idx: usize) -> Option<f64> {
    column
        .get(idx)
        .copied()
        .flatten()
        .filter(|value| value.is_finite())
}
