//! Record of processed webhook events.
//!
//! Providers retry deliveries that time out or return a server error, so the
//! same event can arrive several times. When an event carries an id, the
//! dispatcher consults an [`IdempotencyStore`] before invoking handlers and
//! records the id only after a handler succeeds.

use crate::{EventId, Timestamp};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// Errors from an idempotency store backend
#[derive(Debug, thiserror::Error)]
pub enum IdempotencyError {
    #[error("Idempotency store unavailable: {message}")]
    Unavailable { message: String },
}

/// Result of recording an event id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    /// First time this id was recorded
    Inserted,
    /// Id was already recorded
    AlreadyExists,
}

/// Storage of processed event ids.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// `true` if the event has already been processed successfully
    async fn is_processed(&self, event_id: &EventId) -> Result<bool, IdempotencyError>;

    /// Record an event as processed.
    async fn mark_processed(&self, event_id: &EventId) -> Result<SaveResult, IdempotencyError>;
}

/// Map size at which [`InMemoryIdempotencyStore`] first sweeps expired ids.
pub const DEFAULT_PRUNE_THRESHOLD: usize = 1024;

/// In-process idempotency store.
///
/// Entries live for the configured retention, or for the lifetime of the
/// process when no retention is set. Expired entries are swept from
/// [`mark_processed`](IdempotencyStore::mark_processed) whenever the map
/// reaches the prune threshold; the threshold then doubles relative to the
/// surviving entries so sweeps stay amortised. Not shared between replicas.
#[derive(Debug)]
pub struct InMemoryIdempotencyStore {
    inner: RwLock<Entries>,
    retention: Option<Duration>,
    prune_threshold: usize,
}

#[derive(Debug)]
struct Entries {
    processed: HashMap<EventId, Timestamp>,
    prune_at: usize,
}

impl Default for InMemoryIdempotencyStore {
    fn default() -> Self {
        Self {
            inner: RwLock::new(Entries {
                processed: HashMap::new(),
                prune_at: DEFAULT_PRUNE_THRESHOLD,
            }),
            retention: None,
            prune_threshold: DEFAULT_PRUNE_THRESHOLD,
        }
    }
}

impl InMemoryIdempotencyStore {
    /// Store that keeps every id until the process exits
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that forgets ids older than `retention`
    pub fn with_retention(retention: Duration) -> Self {
        Self {
            retention: Some(retention),
            ..Self::default()
        }
    }

    /// Sweep expired ids once the map holds `threshold` entries
    pub fn with_prune_threshold(mut self, threshold: usize) -> Self {
        let threshold = threshold.max(1);
        self.prune_threshold = threshold;
        self.inner.get_mut().prune_at = threshold;
        self
    }

    /// Number of ids currently recorded, expired entries included
    pub async fn len(&self) -> usize {
        self.inner.read().await.processed.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.processed.is_empty()
    }

    /// Drop expired entries. Returns how many were removed.
    pub async fn prune(&self) -> usize {
        let mut entries = self.inner.write().await;
        self.sweep(&mut entries, Timestamp::now())
    }

    fn sweep(&self, entries: &mut Entries, now: Timestamp) -> usize {
        let Some(retention) = self.retention else {
            return 0;
        };

        let before = entries.processed.len();
        entries
            .processed
            .retain(|_, recorded_at| now.duration_since(*recorded_at) < retention);
        entries.prune_at = self.prune_threshold.max(entries.processed.len() * 2);
        before - entries.processed.len()
    }

    fn is_live(&self, recorded_at: Timestamp, now: Timestamp) -> bool {
        match self.retention {
            Some(retention) => now.duration_since(recorded_at) < retention,
            None => true,
        }
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryIdempotencyStore {
    async fn is_processed(&self, event_id: &EventId) -> Result<bool, IdempotencyError> {
        let now = Timestamp::now();
        let entries = self.inner.read().await;
        Ok(entries
            .processed
            .get(event_id)
            .is_some_and(|recorded_at| self.is_live(*recorded_at, now)))
    }

    async fn mark_processed(&self, event_id: &EventId) -> Result<SaveResult, IdempotencyError> {
        let now = Timestamp::now();
        let mut entries = self.inner.write().await;

        if let Some(recorded_at) = entries.processed.get(event_id) {
            if self.is_live(*recorded_at, now) {
                return Ok(SaveResult::AlreadyExists);
            }
        }

        if entries.processed.len() >= entries.prune_at {
            let removed = self.sweep(&mut entries, now);
            if removed > 0 {
                debug!(removed, remaining = entries.processed.len(), "Pruned expired event ids");
            }
        }

        entries.processed.insert(event_id.clone(), now);
        Ok(SaveResult::Inserted)
    }
}

#[cfg(test)]
#[path = "idempotency_tests.rs"]
mod tests;
