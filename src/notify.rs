//! # Notification Building
//!
//! Turns the windows found for one subscription into a single outbound
//! [`MessageDescriptor`]. The builder never sends anything; it only decides
//! recipient, dedupe key and headers, and asks a [`MessageComposer`] for the
//! subject and body.
//!
//! ## Cardinality
//! At most one descriptor per subscription per run, however many windows
//! qualified. The dedupe key `"{subscription_id}:{forecast_date}"` lets a
//! re-triggered run for the same target date be recognised downstream.

use crate::store::{Spot, Subscription};
use crate::SuitabilityWindow;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Header carrying the one-click unsubscribe link.
pub const LIST_UNSUBSCRIBE_HEADER: &str = "List-Unsubscribe";

/// Spot and date the message is about, kept separately from the composed text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectContext {
    pub spot_name: String,
    pub date: NaiveDate,
}

/// One outbound notification, ready for the dispatcher.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MessageDescriptor {
    pub recipient: String,
    pub subject_context: SubjectContext,
    pub subject: String,
    /// Composed content; opaque to the engine
    pub body: String,
    pub dedupe_key: String,
    pub headers: BTreeMap<String, String>,
}

/// Everything a composer may draw on.
#[derive(Debug, Clone, Copy)]
pub struct MessageContext<'a> {
    pub spot: &'a Spot,
    pub subscription: &'a Subscription,
    pub windows: &'a [SuitabilityWindow],
    pub forecast_date: NaiveDate,
    pub unsubscribe_url: &'a str,
}

/// Subject and body produced for one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedMessage {
    pub subject: String,
    pub body: String,
}

/// Renders message content. Implementations must be pure.
pub trait MessageComposer: Send + Sync {
    fn compose(&self, ctx: &MessageContext<'_>) -> ComposedMessage;
}

impl<F> MessageComposer for F
where
    F: Fn(&MessageContext<'_>) -> ComposedMessage + Send + Sync,
{
    fn compose(&self, ctx: &MessageContext<'_>) -> ComposedMessage {
        self(ctx)
    }
}

/// Plain-text notification listing every qualifying window.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextComposer;

impl MessageComposer for PlainTextComposer {
    fn compose(&self, ctx: &MessageContext<'_>) -> ComposedMessage {
        let day = ctx.forecast_date.format("%d. %b %Y");
        let subject = format!("Suitable conditions for {}", ctx.spot.name);

        let mut body = format!(
            "Wind conditions for {} are suitable on {}.\n\n",
            ctx.spot.name, day
        );
        for window in ctx.windows {
            let (low, high) = window.speed_range();
            let _ = writeln!(
                body,
                "  {}-{}  {:.0}-{:.0} kn",
                window.start_hour.format("%H:%M"),
                window.end_hour_exclusive.format("%H:%M"),
                low,
                high
            );
        }
        let _ = write!(
            body,
            "\nCheck your calendar and get ready to go!\n\n\
             You receive this because you subscribed to {}.\n\
             Unsubscribe: {}\n",
            ctx.spot.name, ctx.unsubscribe_url
        );

        ComposedMessage { subject, body }
    }
}

/// Unsubscribe link for a subscription.
pub fn unsubscribe_url(base_url: &str, subscription_id: &str) -> String {
    format!(
        "{}/subscription/{}/unsubscribe",
        base_url.trim_end_matches('/'),
        subscription_id
    )
}

/// Dedupe key for one subscription and target date.
pub fn dedupe_key(subscription_id: &str, forecast_date: NaiveDate) -> String {
    format!("{subscription_id}:{forecast_date}")
}

/// Build the message for one subscription.
///
/// Returns `None` when `windows` is empty: a subscription without a window is
/// skipped entirely.
pub fn build(
    spot: &Spot,
    subscription: &Subscription,
    windows: &[SuitabilityWindow],
    forecast_date: NaiveDate,
    base_url: &str,
    composer: &dyn MessageComposer,
) -> Option<MessageDescriptor> {
    if windows.is_empty() {
        return None;
    }

    let unsubscribe = unsubscribe_url(base_url, &subscription.id);
    let composed = composer.compose(&MessageContext {
        spot,
        subscription,
        windows,
        forecast_date,
        unsubscribe_url: &unsubscribe,
    });

    let mut headers = BTreeMap::new();
    headers.insert(LIST_UNSUBSCRIBE_HEADER.to_string(), format!("<{unsubscribe}>"));

    Some(MessageDescriptor {
        recipient: subscription.subscriber.email.clone(),
        subject_context: SubjectContext {
            spot_name: spot.name.clone(),
            date: forecast_date,
        },
        subject: composed.subject,
        body: composed.body,
        dedupe_key: dedupe_key(&subscription.id, forecast_date),
        headers,
    })
}
