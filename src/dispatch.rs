//! # Batched Dispatch
//!
//! The email provider accepts at most 100 messages per batch call. The
//! dispatcher splits the run's messages into consecutive slices of at most
//! `batch_size`, hands them to a [`DeliverySender`] one at a time, and records
//! the outcome of each call.
//!
//! ## Failure Semantics
//! A failed batch is recorded against that batch only. Nothing is retried,
//! earlier successful batches stand, and later batches are still attempted.
//! The caller reads the [`DispatchSummary`] and decides what a partial
//! failure means for the run as a whole.

use crate::notify::MessageDescriptor;
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

/// Hard ceiling imposed by the delivery provider.
pub const MAX_BATCH_SIZE: usize = 100;

/// Errors reported by a delivery collaborator for one batch call.
#[derive(Error, Debug)]
pub enum DeliveryError {
    /// Network, TLS or protocol failure before a response arrived
    #[error("delivery request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status
    #[error("delivery provider rejected batch ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// Sender-side failure not tied to HTTP
    #[error("delivery failed: {0}")]
    Other(String),
}

/// Delivers one batch of messages.
#[async_trait]
pub trait DeliverySender: Send + Sync {
    async fn send_batch(&self, batch: &[MessageDescriptor]) -> Result<(), DeliveryError>;
}

/// Outcome of one batch call.
#[derive(Debug)]
pub struct BatchResult {
    /// Zero-based position of the batch in submission order
    pub index: usize,
    /// Number of messages in the batch
    pub size: usize,
    pub outcome: Result<(), DeliveryError>,
}

impl BatchResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Aggregate counts over a dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub batches: usize,
    pub failed_batches: usize,
    /// Messages in batches the sender accepted
    pub delivered_messages: usize,
    /// Messages in batches the sender rejected
    pub failed_messages: usize,
}

impl DispatchSummary {
    pub fn from_results(results: &[BatchResult]) -> Self {
        results.iter().fold(Self::default(), |mut acc, result| {
            acc.batches += 1;
            if result.is_success() {
                acc.delivered_messages += result.size;
            } else {
                acc.failed_batches += 1;
                acc.failed_messages += result.size;
            }
            acc
        })
    }

    pub fn has_failures(&self) -> bool {
        self.failed_batches > 0
    }
}

/// Split `messages` into order-preserving slices of at most `batch_size`.
///
/// `batch_size` is clamped to `1..=MAX_BATCH_SIZE`.
pub fn partition(messages: &[MessageDescriptor], batch_size: usize) -> Vec<&[MessageDescriptor]> {
    messages.chunks(batch_size.clamp(1, MAX_BATCH_SIZE)).collect()
}

/// Submit `messages` to `sender` batch by batch, awaiting each call before the
/// next.
///
/// Returns one [`BatchResult`] per batch in submission order. Empty input
/// returns an empty list without calling the sender.
pub async fn dispatch<S>(
    messages: &[MessageDescriptor],
    batch_size: usize,
    sender: &S,
) -> Vec<BatchResult>
where
    S: DeliverySender + ?Sized,
{
    let batches = partition(messages, batch_size);
    let total = batches.len();
    let mut results = Vec::with_capacity(total);

    for (index, batch) in batches.into_iter().enumerate() {
        let outcome = sender.send_batch(batch).await;
        match &outcome {
            Ok(()) => info!(batch = index + 1, total, size = batch.len(), "batch delivered"),
            Err(error) => warn!(batch = index + 1, total, size = batch.len(), %error, "batch delivery failed"),
        }
        results.push(BatchResult {
            index,
            size: batch.len(),
            outcome,
        });
    }

    results
}
