//! # Subscription Store
//!
//! Spots, subscribers and their preference rules live in an external store
//! owned by the web application. The engine only needs a read-only snapshot
//! per run: every spot that has at least one *verified* subscription, with
//! those subscriptions attached.
//!
//! [`JsonFileStore`] reads that snapshot from a JSON export:
//!
//! ```json
//! {
//!   "spots": [
//!     {
//!       "id": 1,
//!       "name": "Aukrog",
//!       "lat": 54.32,
//!       "long": 9.78,
//!       "subscriptions": [
//!         {
//!           "id": "65356434-ca00-4273-afff-af6354dcb731",
//!           "subscriber": { "id": "k-1", "email": "kiter@example.com" },
//!           "verified_at": "2025-05-01T10:00:00Z",
//!           "rule": {
//!             "wind_speed_min": 14,
//!             "wind_speed_max": 25,
//!             "allowed_directions": ["W", "WSW", "SW"],
//!             "min_temperature": 10
//!           }
//!         }
//!       ]
//!     }
//!   ]
//! }
//! ```

use crate::window::PreferenceRule;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

pub type SpotId = i64;

/// Errors raised while loading the subscription snapshot.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The export could not be read
    #[error("failed to read subscription store {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The export is not valid JSON or does not match the expected shape
    #[error("failed to parse subscription store: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A named location subscribers can watch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Spot {
    pub id: SpotId,
    pub name: String,
    pub lat: f64,
    pub long: f64,
}

/// Contact identity of the person behind a subscription.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: String,
    pub email: String,
}

/// A (spot, subscriber, rule) binding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub subscriber: Subscriber,
    /// Set once the subscriber confirmed the subscription; unverified ones never alert
    #[serde(default)]
    pub verified_at: Option<DateTime<Utc>>,
    pub rule: PreferenceRule,
    /// Evaluate but never notify (test accounts, staging data)
    #[serde(default)]
    pub notifications_suppressed: bool,
}

impl Subscription {
    pub fn is_verified(&self) -> bool {
        self.verified_at.is_some()
    }
}

/// One spot and the subscriptions the engine should evaluate for it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpotSubscriptions {
    #[serde(flatten)]
    pub spot: Spot,
    #[serde(default)]
    pub subscriptions: Vec<Subscription>,
}

/// Read-only source of spots and verified subscriptions.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Spots with at least one verified subscription, each carrying only its
    /// verified subscriptions.
    async fn load_spots(&self) -> Result<Vec<SpotSubscriptions>, StoreError>;
}

/// Subscription store backed by a JSON export on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

#[derive(Deserialize)]
struct StoreExport {
    #[serde(default)]
    spots: Vec<SpotSubscriptions>,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl SubscriptionStore for JsonFileStore {
    async fn load_spots(&self) -> Result<Vec<SpotSubscriptions>, StoreError> {
        let data = tokio::fs::read(&self.path)
            .await
            .map_err(|source| StoreError::Io {
                path: self.path.clone(),
                source,
            })?;
        let export: StoreExport = serde_json::from_slice(&data)?;
        Ok(select_active(export.spots))
    }
}

/// Keep verified subscriptions with a valid rule, and only spots that still
/// have one.
pub fn select_active(spots: Vec<SpotSubscriptions>) -> Vec<SpotSubscriptions> {
    spots
        .into_iter()
        .filter_map(|mut entry| {
            entry.subscriptions.retain(|sub| {
                if !sub.is_verified() {
                    debug!(subscription = %sub.id, "skipping unverified subscription");
                    return false;
                }
                match sub.rule.validate() {
                    Ok(()) => true,
                    Err(error) => {
                        warn!(subscription = %sub.id, %error, "skipping subscription with invalid rule");
                        false
                    }
                }
            });
            (!entry.subscriptions.is_empty()).then_some(entry)
        })
        .collect()
}
