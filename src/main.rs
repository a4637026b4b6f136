//! # Wind Spotter Entry Point
//!
//! One invocation is one scheduled run: load configuration, evaluate every
//! spot for the target day, and email matching subscribers. Meant to be
//! triggered by cron or a systemd timer.
//!
//! ## Usage
//! ```text
//! wind-spotter [--config PATH] [--dry-run] [--stdout]
//! ```
//! - `--config PATH`: configuration file (default `spotter-config.toml`)
//! - `--dry-run`: evaluate and build messages but send nothing
//! - `--stdout`: development mode, prints an ASCII preview per spot; implies
//!   `--dry-run`

use anyhow::{bail, Context};
use chrono::Utc;
use spotter_lib::config::{Config, DEFAULT_CONFIG_PATH};
use spotter_lib::delivery::ResendClient;
use spotter_lib::engine::{AlertEngine, RunReport};
use spotter_lib::forecast::OpenMeteoClient;
use spotter_lib::logging::init_tracing;
use spotter_lib::renderer::draw_ascii;
use spotter_lib::store::JsonFileStore;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Command line options.
#[derive(Debug, Default, PartialEq)]
struct Args {
    config_path: Option<PathBuf>,
    dry_run: bool,
    stdout: bool,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> anyhow::Result<Args> {
    let mut parsed = Args::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().context("--config requires a path")?;
                parsed.config_path = Some(PathBuf::from(path));
            }
            "--dry-run" => parsed.dry_run = true,
            "--stdout" => parsed.stdout = true,
            other => bail!("unknown argument: {other}"),
        }
    }

    Ok(parsed)
}

fn print_report(report: &RunReport) {
    println!(
        "Target date {} ({} spots evaluated, {} skipped)",
        report.target_date,
        report.spots_evaluated,
        report.spots_skipped.len()
    );
    for outcome in &report.outcomes {
        println!();
        draw_ascii(outcome);
    }
    for skipped in &report.spots_skipped {
        println!("\n⚠ {} skipped: {}", skipped.spot_name, skipped.reason);
    }
    println!(
        "\n{} of {} subscriptions matched, {} messages built (not sent)",
        report.subscriptions_matched, report.subscriptions_evaluated, report.messages_built
    );
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    let args = parse_args(env::args().skip(1))?;

    let config_path = args
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let mut config = Config::load_from_path(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;
    config.apply_env_overrides();
    if args.dry_run || args.stdout {
        config.engine.dry_run = true;
    }

    init_tracing(&config.logging.filter);
    info!(config = %config_path.display(), dry_run = config.engine.dry_run, "wind spotter starting");

    let forecast_http = reqwest::Client::builder()
        .timeout(config.forecast.request_timeout())
        .user_agent(USER_AGENT)
        .build()
        .context("building forecast HTTP client")?;
    let provider = OpenMeteoClient::new(
        forecast_http,
        config.forecast.api_url.as_str(),
        config.forecast.wind_speed_unit.as_str(),
    );
    let store = JsonFileStore::new(&config.store.path);

    let mut engine = AlertEngine::new(
        config.engine.clone(),
        config.delivery.base_url.as_str(),
        Arc::new(provider),
        Arc::new(store),
    );

    if !config.engine.dry_run {
        let api_key = config.delivery.api_key().with_context(|| {
            format!(
                "{} is not set; set it or run with --dry-run",
                config.delivery.api_key_env
            )
        })?;
        let delivery_http = reqwest::Client::builder()
            .timeout(config.delivery.request_timeout())
            .user_agent(USER_AGENT)
            .build()
            .context("building delivery HTTP client")?;
        let sender = ResendClient::new(
            delivery_http,
            &config.delivery.api_url,
            api_key,
            config.delivery.from_email.clone(),
        );
        engine = engine.with_sender(Arc::new(sender));
    }

    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(engine.run(Utc::now()))?;

    if args.stdout {
        print_report(&report);
        return Ok(());
    }

    if report.has_failures() {
        warn!(
            failed_batches = report.dispatch.failed_batches,
            failed_messages = report.dispatch.failed_messages,
            "some notifications were not delivered"
        );
        bail!(
            "{} of {} delivery batches failed",
            report.dispatch.failed_batches,
            report.dispatch.batches
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_defaults() {
        assert_eq!(parse_args(args(&[])).unwrap(), Args::default());
    }

    #[test]
    fn test_parse_all_flags() {
        let parsed = parse_args(args(&["--config", "/etc/spotter.toml", "--dry-run", "--stdout"])).unwrap();
        assert_eq!(parsed.config_path, Some(PathBuf::from("/etc/spotter.toml")));
        assert!(parsed.dry_run);
        assert!(parsed.stdout);
    }

    #[test]
    fn test_parse_rejects_unknown_and_dangling() {
        assert!(parse_args(args(&["--verbose"])).is_err());
        assert!(parse_args(args(&["--config"])).is_err());
    }
}
