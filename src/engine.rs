//! # Alert Engine
//!
//! One [`AlertEngine::run`] is one scheduled pass over every spot:
//!
//! 1. load spots with verified subscriptions from the store
//! 2. fetch every spot's forecast for the target day concurrently, keyed by
//!    spot id
//! 3. per spot: localise, normalize, keep daytime hours
//! 4. per subscription: find windows, build at most one message
//! 5. unless in dry-run, dispatch all messages in batches
//!
//! The engine holds configuration and injected collaborators only. Nothing
//! carries over between runs, so an aborted run leaves nothing half-applied.

use crate::config::EngineConfig;
use crate::dispatch::{dispatch, DeliverySender, DispatchSummary};
use crate::forecast::{ForecastError, ForecastProvider, RawForecast};
use crate::notify::{build, MessageComposer, MessageDescriptor, PlainTextComposer};
use crate::store::{SpotId, SpotSubscriptions, StoreError, SubscriptionStore};
use crate::window::{find_windows, viable_hours};
use crate::{HourlyObservation, SuitabilityWindow};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Failures that abort a whole run.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("cannot load subscriptions: {0}")]
    Store(#[from] StoreError),

    #[error("no delivery sender configured and dry-run is off")]
    MissingSender,
}

/// What happened to one subscription in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// No qualifying window; nothing built
    NoWindow,
    /// At least one window; a message was built
    Notified,
    /// At least one window, but the subscription is flagged as suppressed
    Suppressed,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionOutcome {
    pub subscription_id: String,
    pub recipient: String,
    /// Per-hour viability, aligned with [`SpotOutcome::observations`]
    pub viable: Vec<bool>,
    pub windows: Vec<SuitabilityWindow>,
    pub status: SubscriptionStatus,
}

/// Evaluation of one spot.
#[derive(Debug, Clone, Serialize)]
pub struct SpotOutcome {
    pub spot_id: SpotId,
    pub spot_name: String,
    /// Daytime observations the windows were searched in
    pub observations: Vec<HourlyObservation>,
    pub subscriptions: Vec<SubscriptionOutcome>,
}

/// A spot left out of the run because its forecast was unusable.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedSpot {
    pub spot_id: SpotId,
    pub spot_name: String,
    pub reason: String,
}

/// Summary of one run, for logging and the caller's exit status.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub target_date: NaiveDate,
    pub dry_run: bool,
    pub spots_evaluated: usize,
    pub spots_skipped: Vec<SkippedSpot>,
    pub subscriptions_evaluated: usize,
    pub subscriptions_matched: usize,
    pub subscriptions_suppressed: usize,
    pub messages_built: usize,
    pub dispatch: DispatchSummary,
    pub outcomes: Vec<SpotOutcome>,
}

impl RunReport {
    fn new(target_date: NaiveDate, dry_run: bool) -> Self {
        Self {
            target_date,
            dry_run,
            spots_evaluated: 0,
            spots_skipped: Vec::new(),
            subscriptions_evaluated: 0,
            subscriptions_matched: 0,
            subscriptions_suppressed: 0,
            messages_built: 0,
            dispatch: DispatchSummary::default(),
            outcomes: Vec::new(),
        }
    }

    /// True when any delivery batch failed.
    pub fn has_failures(&self) -> bool {
        self.dispatch.has_failures()
    }
}

/// Target day for a run started at `now`: the UTC date `days_ahead` days later.
pub fn target_date(now: DateTime<Utc>, days_ahead: i64) -> NaiveDate {
    (now + Duration::days(days_ahead)).date_naive()
}

/// Orchestrates one pass from forecasts to dispatched notifications.
pub struct AlertEngine {
    config: EngineConfig,
    base_url: String,
    provider: Arc<dyn ForecastProvider>,
    store: Arc<dyn SubscriptionStore>,
    sender: Option<Arc<dyn DeliverySender>>,
    composer: Arc<dyn MessageComposer>,
}

impl AlertEngine {
    /// `base_url` is the public site URL used for unsubscribe links.
    pub fn new(
        config: EngineConfig,
        base_url: impl Into<String>,
        provider: Arc<dyn ForecastProvider>,
        store: Arc<dyn SubscriptionStore>,
    ) -> Self {
        Self {
            config,
            base_url: base_url.into(),
            provider,
            store,
            sender: None,
            composer: Arc::new(PlainTextComposer),
        }
    }

    pub fn with_sender(mut self, sender: Arc<dyn DeliverySender>) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn with_composer(mut self, composer: Arc<dyn MessageComposer>) -> Self {
        self.composer = composer;
        self
    }

    /// Run one full pass as of `now`.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<RunReport, EngineError> {
        let dry_run = self.config.dry_run;
        if !dry_run && self.sender.is_none() {
            return Err(EngineError::MissingSender);
        }

        let target = target_date(now, self.config.days_ahead);
        info!(%target, dry_run, "starting alert run");

        let spots = self.store.load_spots().await?;
        info!(spots = spots.len(), "loaded spots with verified subscriptions");

        let forecasts = self.fetch_forecasts(&spots, target).await;

        let mut report = RunReport::new(target, dry_run);
        let mut messages = Vec::new();
        let mut seen_keys = HashSet::new();

        for entry in &spots {
            let spot = &entry.spot;
            let forecast = match forecasts.get(&spot.id) {
                Some(Ok(raw)) => raw,
                Some(Err(error)) => {
                    warn!(spot = %spot.name, %error, "skipping spot: forecast unavailable");
                    report.spots_skipped.push(SkippedSpot {
                        spot_id: spot.id,
                        spot_name: spot.name.clone(),
                        reason: error.to_string(),
                    });
                    continue;
                }
                None => continue,
            };

            let (outcome, built) = match self.evaluate_spot(entry, forecast, target) {
                Ok(evaluated) => evaluated,
                Err(error) => {
                    warn!(spot = %spot.name, %error, "skipping spot: malformed forecast");
                    report.spots_skipped.push(SkippedSpot {
                        spot_id: spot.id,
                        spot_name: spot.name.clone(),
                        reason: error.to_string(),
                    });
                    continue;
                }
            };

            report.spots_evaluated += 1;
            for sub in &outcome.subscriptions {
                report.subscriptions_evaluated += 1;
                match sub.status {
                    SubscriptionStatus::NoWindow => {}
                    SubscriptionStatus::Notified => report.subscriptions_matched += 1,
                    SubscriptionStatus::Suppressed => {
                        report.subscriptions_matched += 1;
                        report.subscriptions_suppressed += 1;
                    }
                }
            }
            for message in built {
                if seen_keys.insert(message.dedupe_key.clone()) {
                    messages.push(message);
                } else {
                    debug!(key = %message.dedupe_key, "dropping duplicate message");
                }
            }
            report.outcomes.push(outcome);
        }

        report.messages_built = messages.len();

        if dry_run {
            info!(messages = messages.len(), "dry run: discarding built messages");
        } else if let Some(sender) = &self.sender {
            let results = dispatch(&messages, self.config.batch_size, sender.as_ref()).await;
            report.dispatch = DispatchSummary::from_results(&results);
            log_dispatch_summary(&report.dispatch);
        }

        info!(
            spots = report.spots_evaluated,
            skipped = report.spots_skipped.len(),
            matched = report.subscriptions_matched,
            messages = report.messages_built,
            "alert run finished"
        );
        Ok(report)
    }

    /// Fetch every spot's forecast concurrently and key the results by spot id.
    async fn fetch_forecasts(
        &self,
        spots: &[SpotSubscriptions],
        date: NaiveDate,
    ) -> HashMap<SpotId, Result<RawForecast, ForecastError>> {
        let requests = spots.iter().map(|entry| async move {
            let result = self.provider.fetch_hourly(&entry.spot, date).await;
            (entry.spot.id, result)
        });
        join_all(requests).await.into_iter().collect()
    }

    /// Evaluate every subscription of one spot against its forecast.
    ///
    /// Pure apart from logging: returns the outcome and the messages built for
    /// matching, non-suppressed subscriptions.
    pub fn evaluate_spot(
        &self,
        entry: &SpotSubscriptions,
        forecast: &RawForecast,
        target: NaiveDate,
    ) -> Result<(SpotOutcome, Vec<MessageDescriptor>), ForecastError> {
        let observations = forecast.observations(self.config.filter_temperature)?;
        let daytime = self.config.daytime().restrict(&observations);
        debug!(
            spot = %entry.spot.name,
            hours = observations.len(),
            daytime = daytime.len(),
            "normalized forecast"
        );

        let mut subscriptions = Vec::with_capacity(entry.subscriptions.len());
        let mut messages = Vec::new();

        for sub in &entry.subscriptions {
            let rule = if self.config.filter_temperature {
                sub.rule.clone()
            } else {
                sub.rule.without_temperature()
            };
            let windows = find_windows(&daytime, &rule, self.config.min_run_length);

            let status = if windows.is_empty() {
                SubscriptionStatus::NoWindow
            } else if sub.notifications_suppressed {
                SubscriptionStatus::Suppressed
            } else {
                match build(
                    &entry.spot,
                    sub,
                    &windows,
                    target,
                    &self.base_url,
                    self.composer.as_ref(),
                ) {
                    Some(message) => {
                        messages.push(message);
                        SubscriptionStatus::Notified
                    }
                    None => SubscriptionStatus::NoWindow,
                }
            };
            debug!(
                subscription = %sub.id,
                windows = windows.len(),
                ?status,
                "evaluated subscription"
            );

            subscriptions.push(SubscriptionOutcome {
                subscription_id: sub.id.clone(),
                recipient: sub.subscriber.email.clone(),
                viable: viable_hours(&daytime, &rule),
                windows,
                status,
            });
        }

        Ok((
            SpotOutcome {
                spot_id: entry.spot.id,
                spot_name: entry.spot.name.clone(),
                observations: daytime,
                subscriptions,
            },
            messages,
        ))
    }
}

fn log_dispatch_summary(summary: &DispatchSummary) {
    let message = format!(
        "dispatch complete: {}/{} batches delivered, {} messages sent, {} failed",
        summary.batches - summary.failed_batches,
        summary.batches,
        summary.delivered_messages,
        summary.failed_messages
    );

    if summary.failed_batches == 0 {
        info!("{message}");
    } else if summary.failed_batches == summary.batches {
        error!("{message}");
    } else {
        warn!("{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_target_date_uses_utc_day() {
        let now = Utc.with_ymd_and_hms(2025, 6, 11, 23, 30, 0).unwrap();
        assert_eq!(target_date(now, 3), NaiveDate::from_ymd_opt(2025, 6, 14).unwrap());
        assert_eq!(target_date(now, 0), NaiveDate::from_ymd_opt(2025, 6, 11).unwrap());
    }

    #[test]
    fn test_report_failures_follow_dispatch() {
        let mut report = RunReport::new(NaiveDate::from_ymd_opt(2025, 6, 14).unwrap(), false);
        assert!(!report.has_failures());
        report.dispatch.failed_batches = 1;
        assert!(report.has_failures());
    }
}
