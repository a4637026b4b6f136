//! # Email Delivery
//!
//! [`ResendClient`] is the production [`DeliverySender`]: it posts each batch
//! to the Resend batch-email endpoint as one request. The provider caps a
//! batch at 100 emails; the dispatcher is responsible for never exceeding
//! that, this client only reports whether the call succeeded.
//!
//! Every request carries an `Idempotency-Key` derived from the target date
//! and the batch's dedupe keys. A second run for the same day that rebuilds
//! the same batch reuses the key, and the provider drops the repeat.

use crate::dispatch::{DeliveryError, DeliverySender};
use crate::notify::MessageDescriptor;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::debug;

/// Header carrying the message's dedupe key, so repeated sends for the same
/// subscription and date are recognisable in the provider's logs.
pub const DEDUPE_HEADER: &str = "X-Entity-Ref-ID";

/// Request header the provider uses to discard repeated batch submissions.
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// HTTP client for the Resend batch API.
#[derive(Clone)]
pub struct ResendClient {
    http: Client,
    endpoint: String,
    api_key: String,
    from: String,
}

#[derive(Debug, Serialize)]
struct OutboundEmail<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
    headers: BTreeMap<&'a str, &'a str>,
}

impl ResendClient {
    /// `api_url` is the provider base URL, e.g. `https://api.resend.com`.
    pub fn new(http: Client, api_url: &str, api_key: String, from: String) -> Self {
        Self {
            http,
            endpoint: format!("{}/emails/batch", api_url.trim_end_matches('/')),
            api_key,
            from,
        }
    }

    fn payload<'a>(&'a self, batch: &'a [MessageDescriptor]) -> Vec<OutboundEmail<'a>> {
        batch
            .iter()
            .map(|message| {
                let mut headers: BTreeMap<&str, &str> = message
                    .headers
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str()))
                    .collect();
                headers.insert(DEDUPE_HEADER, message.dedupe_key.as_str());

                OutboundEmail {
                    from: &self.from,
                    to: [message.recipient.as_str()],
                    subject: &message.subject,
                    text: &message.body,
                    headers,
                }
            })
            .collect()
    }
}

/// Key identifying one batch across runs: `wind-spotter/{date}/{sha256 of dedupe keys}`.
///
/// The date comes from the first message; the digest covers every dedupe key
/// in order, so the same messages in the same order always give the same key.
pub fn idempotency_key(batch: &[MessageDescriptor]) -> String {
    let date = batch
        .first()
        .map(|message| message.subject_context.date.to_string())
        .unwrap_or_default();

    let mut hasher = Sha256::new();
    for message in batch {
        hasher.update(message.dedupe_key.as_bytes());
        hasher.update(b"\n");
    }
    format!("wind-spotter/{date}/{:x}", hasher.finalize())
}

#[async_trait]
impl DeliverySender for ResendClient {
    async fn send_batch(&self, batch: &[MessageDescriptor]) -> Result<(), DeliveryError> {
        let payload = self.payload(batch);
        let key = idempotency_key(batch);
        debug!(endpoint = %self.endpoint, emails = payload.len(), %key, "posting email batch");

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header(IDEMPOTENCY_HEADER, &key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
