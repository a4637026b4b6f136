//! # Forecast Acquisition
//!
//! The engine consumes hourly forecasts through the [`ForecastProvider`]
//! trait. The production provider is [`OpenMeteoClient`], which queries the
//! free Open-Meteo forecast API for one spot and one local day at a time.
//!
//! ## Data Shape
//! Open-Meteo answers column-wise:
//!
//! ```json
//! {
//!   "utc_offset_seconds": 7200,
//!   "hourly": {
//!     "time": [1749852000, 1749855600],
//!     "wind_speed_10m": [14.2, null],
//!     "wind_direction_10m": [250, 245],
//!     "temperature_2m": [17.1, 17.4]
//!   }
//! }
//! ```
//!
//! [`RawForecast`] keeps that layout verbatim; [`RawForecast::observations`]
//! localises the timestamps and hands the columns to the normalizer.
//!
//! ## Error Handling
//! Every failure for a spot (network, non-2xx status, undecodable body,
//! missing `hourly` block, bogus offset) surfaces as a [`ForecastError`].
//! The engine skips that spot for the run and carries on with the others.

use crate::normalize::normalize;
use crate::store::Spot;
use crate::HourlyObservation;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Hourly variables requested from the provider, in column order.
const HOURLY_VARIABLES: &str = "wind_speed_10m,wind_direction_10m,temperature_2m";

/// Errors that can occur while fetching or decoding a spot's forecast.
#[derive(Error, Debug)]
pub enum ForecastError {
    /// HTTP request failed (network, TLS, timeout, or undecodable body)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status
    #[error("forecast provider returned {status}: {reason}")]
    Status { status: u16, reason: String },

    /// The response carried no hourly block at all
    #[error("forecast response has no hourly data")]
    MissingHourly,

    /// The UTC offset cannot be represented as a fixed offset
    #[error("invalid UTC offset: {0} seconds")]
    InvalidOffset(i32),

    /// A timestamp is outside the representable range
    #[error("invalid forecast timestamp: {0}")]
    InvalidTimestamp(i64),
}

/// Hourly forecast for one spot, still in the provider's columnar layout.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawForecast {
    /// Offset of the spot's local time from UTC
    pub utc_offset_seconds: i32,
    /// Start of each hour, seconds since the Unix epoch
    pub times: Vec<i64>,
    pub wind_speed: Vec<Option<f64>>,
    pub wind_direction: Vec<Option<f64>>,
    pub temperature: Vec<Option<f64>>,
}

impl RawForecast {
    /// Hour start times in the spot's local offset.
    pub fn local_times(&self) -> Result<Vec<DateTime<FixedOffset>>, ForecastError> {
        let offset = FixedOffset::east_opt(self.utc_offset_seconds)
            .ok_or(ForecastError::InvalidOffset(self.utc_offset_seconds))?;

        self.times
            .iter()
            .map(|&secs| {
                DateTime::from_timestamp(secs, 0)
                    .map(|utc| utc.with_timezone(&offset))
                    .ok_or(ForecastError::InvalidTimestamp(secs))
            })
            .collect()
    }

    /// Localise and normalize into complete hourly observations.
    pub fn observations(
        &self,
        require_temperature: bool,
    ) -> Result<Vec<HourlyObservation>, ForecastError> {
        let times = self.local_times()?;
        Ok(normalize(
            &times,
            &self.wind_speed,
            &self.wind_direction,
            Some(&self.temperature),
            require_temperature,
        ))
    }
}

/// Source of hourly forecasts.
#[async_trait]
pub trait ForecastProvider: Send + Sync {
    /// Hourly forecast covering the spot-local calendar day `date`.
    async fn fetch_hourly(&self, spot: &Spot, date: NaiveDate) -> Result<RawForecast, ForecastError>;
}

// -- Open-Meteo --

#[derive(Debug, Deserialize)]
struct OpenMeteoResponse {
    #[serde(default)]
    utc_offset_seconds: i32,
    #[serde(default)]
    hourly: Option<OpenMeteoHourly>,
}

#[derive(Debug, Deserialize)]
struct OpenMeteoHourly {
    #[serde(default)]
    time: Vec<i64>,
    #[serde(default)]
    wind_speed_10m: Vec<Option<f64>>,
    #[serde(default)]
    wind_direction_10m: Vec<Option<f64>>,
    #[serde(default)]
    temperature_2m: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct OpenMeteoError {
    #[serde(default)]
    reason: String,
}

impl OpenMeteoResponse {
    fn into_raw(self) -> Result<RawForecast, ForecastError> {
        let hourly = self.hourly.ok_or(ForecastError::MissingHourly)?;
        if hourly.time.is_empty() {
            return Err(ForecastError::MissingHourly);
        }
        Ok(RawForecast {
            utc_offset_seconds: self.utc_offset_seconds,
            times: hourly.time,
            wind_speed: hourly.wind_speed_10m,
            wind_direction: hourly.wind_direction_10m,
            temperature: hourly.temperature_2m,
        })
    }
}

/// Forecast provider backed by the Open-Meteo `/v1/forecast` endpoint.
#[derive(Clone)]
pub struct OpenMeteoClient {
    http: Client,
    api_url: String,
    wind_speed_unit: String,
}

impl OpenMeteoClient {
    pub fn new(http: Client, api_url: impl Into<String>, wind_speed_unit: impl Into<String>) -> Self {
        Self {
            http,
            api_url: api_url.into(),
            wind_speed_unit: wind_speed_unit.into(),
        }
    }

    fn query(&self, spot: &Spot, date: NaiveDate) -> Vec<(&'static str, String)> {
        let day = date.format("%Y-%m-%d").to_string();
        vec![
            ("latitude", spot.lat.to_string()),
            ("longitude", spot.long.to_string()),
            ("hourly", HOURLY_VARIABLES.to_string()),
            ("wind_speed_unit", self.wind_speed_unit.clone()),
            ("timezone", "auto".to_string()),
            ("timeformat", "unixtime".to_string()),
            ("start_date", day.clone()),
            ("end_date", day),
        ]
    }
}

#[async_trait]
impl ForecastProvider for OpenMeteoClient {
    async fn fetch_hourly(&self, spot: &Spot, date: NaiveDate) -> Result<RawForecast, ForecastError> {
        debug!(spot = %spot.name, %date, "requesting hourly forecast");

        let response = self
            .http
            .get(&self.api_url)
            .query(&self.query(spot, date))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let reason = response
                .json::<OpenMeteoError>()
                .await
                .map(|e| e.reason)
                .unwrap_or_default();
            return Err(ForecastError::Status {
                status: status.as_u16(),
                reason,
            });
        }

        response.json::<OpenMeteoResponse>().await?.into_raw()
    }
}
