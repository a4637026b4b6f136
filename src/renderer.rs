//! # Forecast Preview Rendering
//!
//! Terminal rendering of an evaluated spot for the `--stdout` development
//! mode: a wind speed chart over the daytime hours, the sector and
//! temperature per hour, and one marker row per subscription.

use crate::direction::classify;
use crate::engine::{SpotOutcome, SubscriptionStatus};
use crate::HourlyObservation;
use std::fmt::Write;

const ROWS: usize = 12;
const Y_AXIS_WIDTH: usize = 5;
const COLUMN_WIDTH: usize = 4;

/// Lowest and highest wind speed, widened so a flat series still spans a row.
fn speed_bounds(observations: &[HourlyObservation]) -> (f64, f64) {
    let (min, max) = observations
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), obs| {
            (min.min(obs.wind_speed), max.max(obs.wind_speed))
        });
    let min = min.floor();
    let max = max.ceil();
    if max - min < 1.0 {
        (min, min + 1.0)
    } else {
        (min, max)
    }
}

/// Marker for one hour of one subscription: `#` inside a window, `o` viable
/// but too short a run, `.` otherwise.
fn hour_marker(in_window: bool, viable: bool) -> char {
    match (in_window, viable) {
        (true, _) => '#',
        (false, true) => 'o',
        (false, false) => '.',
    }
}

fn status_label(status: SubscriptionStatus) -> &'static str {
    match status {
        SubscriptionStatus::NoWindow => "no window",
        SubscriptionStatus::Notified => "notify",
        SubscriptionStatus::Suppressed => "suppressed",
    }
}

fn pad_cell(text: &str) -> String {
    format!("{:<width$}", text, width = COLUMN_WIDTH)
}

/// Render one evaluated spot as a multi-line string.
pub fn render_ascii(outcome: &SpotOutcome) -> String {
    let mut out = String::new();
    let observations = &outcome.observations;

    let _ = writeln!(out, "== {} ==", outcome.spot_name);
    if observations.is_empty() {
        let _ = writeln!(out, "(no usable daytime hours)");
        return out;
    }

    let (min_speed, max_speed) = speed_bounds(observations);
    let speed_to_row = |speed: f64| {
        let normalized = (speed - min_speed) / (max_speed - min_speed);
        ((1.0 - normalized) * (ROWS as f64 - 1.0)).round() as usize
    };

    let width = Y_AXIS_WIDTH + observations.len() * COLUMN_WIDTH;
    let mut grid = vec![vec![' '; width]; ROWS];

    for row in grid.iter_mut() {
        row[Y_AXIS_WIDTH - 1] = '│';
    }
    for speed in [min_speed, (min_speed + max_speed) / 2.0, max_speed] {
        let row = speed_to_row(speed).min(ROWS - 1);
        let label = format!("{:<width$.0}", speed, width = Y_AXIS_WIDTH - 1);
        for (i, ch) in label.chars().take(Y_AXIS_WIDTH - 1).enumerate() {
            grid[row][i] = ch;
        }
    }

    // Filled point when any subscription has this hour inside a window
    let in_any_window = |index: usize| {
        outcome.subscriptions.iter().any(|sub| {
            sub.windows
                .iter()
                .any(|w| w.hours.iter().any(|h| h.time == observations[index].time))
        })
    };

    for (index, obs) in observations.iter().enumerate() {
        let row = speed_to_row(obs.wind_speed).min(ROWS - 1);
        let column = Y_AXIS_WIDTH + index * COLUMN_WIDTH + 1;
        grid[row][column] = if in_any_window(index) { '■' } else { '•' };
    }

    let _ = writeln!(out, "kn");
    for row in grid {
        let _ = writeln!(out, "{}", row.into_iter().collect::<String>().trim_end());
    }

    let padding = " ".repeat(Y_AXIS_WIDTH);
    let hours: String = observations
        .iter()
        .map(|obs| pad_cell(&obs.time.format("%H").to_string()))
        .collect();
    let sectors: String = observations
        .iter()
        .map(|obs| pad_cell(classify(obs.wind_direction_degrees).as_str()))
        .collect();
    let temperatures: String = observations
        .iter()
        .map(|obs| match obs.temperature {
            Some(t) => pad_cell(&format!("{t:.0}°")),
            None => pad_cell("-"),
        })
        .collect();

    let _ = writeln!(out, "{}", format!("{padding}{hours}").trim_end());
    let _ = writeln!(out, "{}", format!("{padding}{sectors}").trim_end());
    let _ = writeln!(out, "{}", format!("{padding}{temperatures}").trim_end());

    for sub in &outcome.subscriptions {
        let markers: String = observations
            .iter()
            .enumerate()
            .map(|(index, obs)| {
                let in_window = sub
                    .windows
                    .iter()
                    .any(|w| w.hours.iter().any(|h| h.time == obs.time));
                let viable = sub.viable.get(index).copied().unwrap_or(false);
                pad_cell(&format!(" {}", hour_marker(in_window, viable)))
            })
            .collect();
        let _ = writeln!(
            out,
            "{padding}{}  {} ({}, {})",
            markers.trim_end(),
            sub.subscription_id,
            sub.recipient,
            status_label(sub.status)
        );
    }

    out
}

/// Print one evaluated spot to stdout.
pub fn draw_ascii(outcome: &SpotOutcome) {
    print!("{}", render_ascii(outcome));
}
