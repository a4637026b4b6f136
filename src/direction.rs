//! # Compass Direction Classification
//!
//! Maps a wind bearing in degrees onto the 16-point compass rose used by
//! subscription preferences. Each named direction owns a 22.5° sector centred
//! on it, so sector boundaries fall on odd multiples of 11.25°:
//!
//! ```text
//!   N    348.75° .. 11.25°
//!   NNE   11.25° .. 33.75°
//!   NE    33.75° .. 56.25°
//!   ...
//!   NNW  326.25° .. 348.75°
//! ```
//!
//! A bearing exactly on a boundary belongs to the clockwise sector.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Width of one compass sector in degrees.
const SECTOR_DEGREES: f64 = 22.5;

/// One of the 16 named compass directions, in clockwise order from north.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    N,
    NNE,
    NE,
    ENE,
    E,
    ESE,
    SE,
    SSE,
    S,
    SSW,
    SW,
    WSW,
    W,
    WNW,
    NW,
    NNW,
}

impl Direction {
    /// All directions in compass order; a direction's position here is its
    /// sector index.
    pub const ALL: [Direction; 16] = [
        Direction::N,
        Direction::NNE,
        Direction::NE,
        Direction::ENE,
        Direction::E,
        Direction::ESE,
        Direction::SE,
        Direction::SSE,
        Direction::S,
        Direction::SSW,
        Direction::SW,
        Direction::WSW,
        Direction::W,
        Direction::WNW,
        Direction::NW,
        Direction::NNW,
    ];

    /// Abbreviation used in configuration, stored subscriptions and messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::N => "N",
            Direction::NNE => "NNE",
            Direction::NE => "NE",
            Direction::ENE => "ENE",
            Direction::E => "E",
            Direction::ESE => "ESE",
            Direction::SE => "SE",
            Direction::SSE => "SSE",
            Direction::S => "S",
            Direction::SSW => "SSW",
            Direction::SW => "SW",
            Direction::WSW => "WSW",
            Direction::W => "W",
            Direction::WNW => "WNW",
            Direction::NW => "NW",
            Direction::NNW => "NNW",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the 16 abbreviations.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown compass direction: {0:?}")]
pub struct ParseDirectionError(pub String);

impl FromStr for Direction {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Direction::ALL
            .iter()
            .copied()
            .find(|dir| dir.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ParseDirectionError(s.to_string()))
    }
}

/// Classify a bearing in degrees into its named compass direction.
///
/// Computes `round(degrees / 22.5) mod 16` with half-up rounding and a
/// Euclidean modulo, so any real input is accepted: `360°` and `-22.5°` wrap
/// to `N` and `NNW` respectively. Non-finite input classifies as `N`; callers
/// must drop missing readings before getting here.
///
/// # Example
/// ```
/// use spotter_lib::direction::{classify, Direction};
///
/// assert_eq!(classify(0.0), Direction::N);
/// assert_eq!(classify(247.0), Direction::WSW);
/// ```
pub fn classify(degrees: f64) -> Direction {
    if !degrees.is_finite() {
        return Direction::N;
    }
    let index = (degrees / SECTOR_DEGREES + 0.5).floor().rem_euclid(16.0) as usize;
    Direction::ALL[index % 16]
}
