//! # Wind Spotter Core Library
//!
//! This library holds the forecast-to-alert matching engine behind the wind
//! spotter service. Subscribers pick a spot, a wind speed range, a set of
//! compass directions and optionally a minimum temperature; once per scheduled
//! run the engine looks a few days ahead and emails everyone whose conditions
//! hold for a sustained stretch of daylight hours.
//!
//! ## Data Flow
//! 1. **Fetch**: hourly forecast per spot from the forecast provider
//!    ([`forecast`]), keyed by spot id
//! 2. **Normalize**: zip the provider's parallel arrays into
//!    [`HourlyObservation`]s, dropping incomplete hours ([`normalize`])
//! 3. **Filter**: keep daylight hours only ([`daytime`])
//! 4. **Match**: find contiguous runs of viable hours per subscription
//!    ([`window`], [`direction`])
//! 5. **Build**: one message per matching subscription ([`notify`])
//! 6. **Dispatch**: send messages in bounded batches ([`dispatch`], [`delivery`])
//!
//! [`engine::AlertEngine`] wires the steps together around injected
//! collaborators so a run is a pure function of its inputs plus whatever the
//! collaborators do.
//!
//! ## Core Types
//! - [`HourlyObservation`]: one complete forecast hour at a spot
//! - [`SuitabilityWindow`]: a run of consecutive observations meeting a rule

use chrono::{DateTime, Duration, FixedOffset};
use serde::{Deserialize, Serialize};

// Module declarations
pub mod config;
pub mod daytime;
pub mod delivery;
pub mod direction;
pub mod dispatch;
pub mod engine;
pub mod forecast;
pub mod logging;
pub mod normalize;
pub mod notify;
pub mod renderer;
pub mod store;
pub mod window;

#[cfg(test)]
mod tests;

/// A single forecast hour with every field the matcher consumes.
///
/// `time` carries the spot's UTC offset, so `time.hour()` and
/// `time.date_naive()` give the local hour-of-day and local calendar date.
/// Sequences of observations are always ordered by `time`; hours dropped
/// during normalization leave gaps that are never filled.
///
/// # Example
/// ```
/// use chrono::{FixedOffset, TimeZone};
/// use spotter_lib::HourlyObservation;
///
/// let cest = FixedOffset::east_opt(2 * 3600).unwrap();
/// let obs = HourlyObservation {
///     time: cest.with_ymd_and_hms(2025, 6, 14, 10, 0, 0).unwrap(),
///     wind_speed: 17.5,
///     wind_direction_degrees: 250.0,
///     temperature: Some(19.0),
/// };
///
/// assert_eq!(obs.wind_speed, 17.5);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HourlyObservation {
    /// Start of the forecast hour in spot-local time
    pub time: DateTime<FixedOffset>,
    /// Wind speed in the unit requested from the provider (knots by default)
    pub wind_speed: f64,
    /// Direction the wind blows from, degrees clockwise from north
    pub wind_direction_degrees: f64,
    /// Air temperature in °C, `None` when the provider left it out
    pub temperature: Option<f64>,
}

/// A contiguous run of observations that all satisfy one preference rule.
///
/// Windows are derived on every run and never persisted. `hours` always holds
/// exactly the run length the finder was asked for.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SuitabilityWindow {
    /// The qualifying observations, in time order
    pub hours: Vec<HourlyObservation>,
    /// Time of the first qualifying hour
    pub start_hour: DateTime<FixedOffset>,
    /// One hour past the last qualifying hour
    pub end_hour_exclusive: DateTime<FixedOffset>,
}

impl SuitabilityWindow {
    /// Build a window over a non-empty run of observations.
    ///
    /// Returns `None` for an empty slice.
    pub fn from_hours(hours: &[HourlyObservation]) -> Option<Self> {
        let first = hours.first()?;
        let last = hours.last()?;
        Some(Self {
            hours: hours.to_vec(),
            start_hour: first.time,
            end_hour_exclusive: last.time + Duration::hours(1),
        })
    }

    /// Lowest and highest wind speed inside the window.
    pub fn speed_range(&self) -> (f64, f64) {
        self.hours
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), obs| {
                (min.min(obs.wind_speed), max.max(obs.wind_speed))
            })
    }
}
