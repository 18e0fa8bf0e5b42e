//! Best-effort sync engine.
//!
//! The engine pushes a school's pending records to the server in one
//! batch and prunes exactly that batch from the local store once the
//! server acknowledges it. Local capture never waits for the network:
//! saves return immediately and a flush runs as a detached task, with the
//! next insert doubling as the retry schedule. There is no timer and no
//! backoff.
//!
//! Pruning is by row id, not by school: records inserted while a batch is
//! in flight are not part of the transmitted set and survive the
//! post-acknowledgment delete, staying pending for the next flush.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::api::RemoteApi;
use crate::error::{Error, Result};
use crate::worker::StoreHandle;

/// What a flush accomplished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Nothing was pending; no request was made.
    Idle,
    /// The server acknowledged a batch and it was pruned locally.
    Flushed {
        /// Number of records pushed and pruned.
        pushed: usize,
    },
}

/// Notification emitted by a detached flush.
///
/// One event per attempt. Delivery is best effort; a slow or absent
/// listener never stalls a flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A batch was delivered and pruned.
    Synced {
        /// School the batch belonged to.
        school: String,
        /// Number of records delivered.
        pushed: usize,
    },
    /// The attempt failed; all pending records were kept.
    Failed {
        /// School whose batch could not be delivered.
        school: String,
        /// Description of the failure.
        message: String,
    },
    /// Nothing was pending for the school.
    Idle {
        /// School that was checked.
        school: String,
    },
}

/// Push-then-prune sync engine for one local store.
#[derive(Debug, Clone)]
pub struct SyncEngine {
    store: StoreHandle,
    api: Arc<dyn RemoteApi>,
    events: Option<mpsc::Sender<SyncEvent>>,
}

impl SyncEngine {
    /// Create an engine over a store worker and a server API.
    #[must_use]
    pub fn new(store: StoreHandle, api: Arc<dyn RemoteApi>) -> Self {
        Self {
            store,
            api,
            events: None,
        }
    }

    /// Wire an event channel; every detached flush reports through it.
    #[must_use]
    pub fn with_events(mut self, events: mpsc::Sender<SyncEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Flush a school's pending records.
    ///
    /// Lists the pending batch, pushes it in a single request, and on
    /// acknowledgment deletes exactly the transmitted rows. When nothing
    /// is pending, returns [`SyncOutcome::Idle`] without touching the
    /// network.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SyncFailed`] when the push does not get a success
    /// acknowledgment; every pending record stays in the store. Storage
    /// failures surface as their own error family.
    pub async fn flush(&self, school: &str) -> Result<SyncOutcome> {
        let pending = self.store.list_by_school(school).await?;
        if pending.is_empty() {
            debug!("Nothing pending for {}", school);
            return Ok(SyncOutcome::Idle);
        }

        let ids: Vec<i64> = pending.iter().filter_map(|record| record.id).collect();
        let batch_len = pending.len();

        info!("Pushing {} violations for {}", batch_len, school);
        let ack = self
            .api
            .push_violations(&pending)
            .await
            .map_err(|e| Error::sync_failed(school, e.to_string()))?;

        // Prune only the transmitted rows; anything inserted while the
        // push was in flight stays pending.
        let pruned = match self.store.delete_batch(ids).await {
            Ok(pruned) => pruned,
            Err(e) => {
                warn!(
                    error = %e,
                    "Server accepted batch for {} but local prune failed", school
                );
                return Err(e);
            }
        };

        debug!("Server ack: {:?}; pruned {} local records", ack.message, pruned);
        Ok(SyncOutcome::Flushed { pushed: batch_len })
    }

    /// Run a flush as a detached task.
    ///
    /// Used after every successful save. The outcome is logged and, when
    /// an event channel is wired, reported as one [`SyncEvent`]; it never
    /// escalates to the caller. A failed attempt leaves the records
    /// pending, to be retried by whichever flush comes next.
    pub fn spawn_flush(&self, school: &str) {
        let engine = self.clone();
        let school = school.to_string();

        tokio::spawn(async move {
            let event = match engine.flush(&school).await {
                Ok(SyncOutcome::Flushed { pushed }) => {
                    info!("Synced {} violations for {}", pushed, school);
                    SyncEvent::Synced {
                        school: school.clone(),
                        pushed,
                    }
                }
                Ok(SyncOutcome::Idle) => SyncEvent::Idle {
                    school: school.clone(),
                },
                Err(e) => {
                    warn!(
                        error = %e,
                        "Sync failed for {}; records kept for a later attempt", school
                    );
                    SyncEvent::Failed {
                        school: school.clone(),
                        message: e.to_string(),
                    }
                }
            };

            if let Some(events) = &engine.events {
                // Best effort; a full or dropped channel is not an error.
                let _ = events.try_send(event);
            }
        });
    }
}
