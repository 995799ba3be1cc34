//! Snapshots — whole-collection copies for rollback.
//!
//! A snapshot holds independent copies of the three volatile collections
//! (cruises, legacy bookings, casino offers). Snapshots live in a bounded
//! ring; the oldest is evicted on overflow. They are rollback points, not
//! persistence checkpoints, and are never written to disk.
//!
//! RULE: Guarded operations are the only transactional mechanism. There is
//! no undo log; a failed guarded mutation restores the whole collections
//! from the snapshot taken before it ran.

use crate::error::{StoreError, StoreResult};
use crate::model::{BookedCruise, CasinoOffer, Cruise};
use crate::store::RecordStore;
use crate::types::{SnapshotId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationType {
    WebUpdate,
    Import,
    ManualFix,
    BatchVerify,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub id:             SnapshotId,
    pub timestamp:      Timestamp,
    pub description:    String,
    pub operation_type: OperationType,
    pub cruises:        Vec<Cruise>,
    pub booked_cruises: Vec<BookedCruise>,
    pub casino_offers:  Vec<CasinoOffer>,
}

/// Bounded, insertion-ordered snapshot store.
#[derive(Debug, Clone)]
pub struct SnapshotRing {
    capacity: usize,
    entries:  VecDeque<Snapshot>,
}

impl SnapshotRing {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { capacity, entries: VecDeque::with_capacity(capacity) }
    }

    /// Insert, returning the evicted oldest snapshot on overflow.
    pub fn push(&mut self, snapshot: Snapshot) -> Option<Snapshot> {
        self.entries.push_back(snapshot);
        if self.entries.len() > self.capacity {
            self.entries.pop_front()
        } else {
            None
        }
    }

    pub fn get(&self, id: &str) -> Option<&Snapshot> {
        self.entries.iter().find(|s| s.id == id)
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|s| s.id != id);
        self.entries.len() != before
    }

    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Newest first.
    pub fn iter_newest(&self) -> impl Iterator<Item = &Snapshot> {
        self.entries.iter().rev()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSummary {
    pub id:             SnapshotId,
    pub timestamp:      Timestamp,
    pub description:    String,
    pub operation_type: OperationType,
    pub cruise_count:   usize,
    pub booked_count:   usize,
    pub offer_count:    usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoredCounts {
    pub cruises_restored:        usize,
    pub booked_cruises_restored: usize,
    pub offers_restored:         usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackOutcome {
    pub success:                  bool,
    pub message:                  String,
    pub changes:                  RestoredCounts,
    /// Snapshot of the state that was replaced, so the rollback itself can
    /// be undone.
    pub pre_rollback_snapshot_id: Option<SnapshotId>,
}

impl RollbackOutcome {
    fn failed(message: String) -> Self {
        Self {
            success: false,
            message,
            changes: RestoredCounts::default(),
            pre_rollback_snapshot_id: None,
        }
    }
}

/// Result of a single guarded mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardedOutcome<T> {
    /// The mutation succeeded. `snapshot_id` still allows a manual rollback.
    Committed { value: T, snapshot_id: SnapshotId },
    /// The mutation failed and the store was rolled back.
    RolledBack {
        error:       String,
        snapshot_id: SnapshotId,
        rollback:    RollbackOutcome,
    },
}

impl<T> GuardedOutcome<T> {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }

    pub fn snapshot_id(&self) -> &str {
        match self {
            Self::Committed { snapshot_id, .. } | Self::RolledBack { snapshot_id, .. } => snapshot_id,
        }
    }

    /// For a rolled-back outcome, whether the rollback itself succeeded.
    /// Always true for committed outcomes.
    pub fn rollback_clean(&self) -> bool {
        match self {
            Self::Committed { .. } => true,
            Self::RolledBack { rollback, .. } => rollback.success,
        }
    }

    pub fn value(self) -> Option<T> {
        match self {
            Self::Committed { value, .. } => Some(value),
            Self::RolledBack { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub success:     bool,
    pub processed:   usize,
    pub successful:  usize,
    pub failed:      usize,
    pub errors:      Vec<String>,
    pub snapshot_id: SnapshotId,
    /// Present when the batch aborted and the store was rolled back.
    pub rollback:    Option<RollbackOutcome>,
}

impl RecordStore {
    /// Copy cruises, legacy bookings and offers into the ring.
    pub fn create_snapshot(&mut self, description: &str, operation_type: OperationType) -> SnapshotId {
        let now = self.clock.now();
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let id = format!("snapshot_{}_{}", now.timestamp_millis(), &suffix[..9]);
        let snapshot = Snapshot {
            id:             id.clone(),
            timestamp:      now,
            description:    description.to_string(),
            operation_type,
            cruises:        self.state.cruises.clone(),
            booked_cruises: self.state.booked_cruises.clone(),
            casino_offers:  self.state.casino_offers.clone(),
        };
        if let Some(evicted) = self.snapshots.push(snapshot) {
            log::debug!("snapshot: evicted {} ({})", evicted.id, evicted.description);
        }
        log::info!("snapshot: created {id} - {description}");
        id
    }

    pub fn snapshot(&self, id: &str) -> Option<&Snapshot> {
        self.snapshots.get(id)
    }

    /// Snapshot summaries, newest first.
    pub fn list_snapshots(&self) -> Vec<SnapshotSummary> {
        let mut out: Vec<SnapshotSummary> = self
            .snapshots
            .iter_newest()
            .map(|s| SnapshotSummary {
                id:             s.id.clone(),
                timestamp:      s.timestamp,
                description:    s.description.clone(),
                operation_type: s.operation_type,
                cruise_count:   s.cruises.len(),
                booked_count:   s.booked_cruises.len(),
                offer_count:    s.casino_offers.len(),
            })
            .collect();
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        out
    }

    /// Replace the three collections with the snapshot's copies. The
    /// current state is snapshotted first as a pre-rollback point.
    pub fn rollback_to(&mut self, id: &str) -> StoreResult<RollbackOutcome> {
        // Clone first: the pre-rollback snapshot may evict the target.
        let target = self
            .snapshots
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::SnapshotNotFound { id: id.to_string() })?;

        let pre_id = self.create_snapshot(
            &format!("Pre-rollback state (rolling back to: {})", target.description),
            OperationType::ManualFix,
        );

        let before = (
            self.state.cruises.len(),
            self.state.booked_cruises.len(),
            self.state.casino_offers.len(),
        );
        let changes = RestoredCounts {
            cruises_restored:        target.cruises.len(),
            booked_cruises_restored: target.booked_cruises.len(),
            offers_restored:         target.casino_offers.len(),
        };
        self.state.cruises = target.cruises;
        self.state.booked_cruises = target.booked_cruises;
        self.state.casino_offers = target.casino_offers;
        self.touch();

        log::info!(
            "snapshot: rolled back to {id} (cruises {} -> {}, booked {} -> {}, offers {} -> {})",
            before.0, changes.cruises_restored,
            before.1, changes.booked_cruises_restored,
            before.2, changes.offers_restored
        );

        Ok(RollbackOutcome {
            success: true,
            message: format!(
                "Successfully rolled back to: {} ({})",
                target.description,
                target.timestamp.to_rfc3339()
            ),
            changes,
            pre_rollback_snapshot_id: Some(pre_id),
        })
    }

    pub fn delete_snapshot(&mut self, id: &str) -> bool {
        let removed = self.snapshots.remove(id);
        if removed {
            log::debug!("snapshot: deleted {id}");
        }
        removed
    }

    pub fn clear_snapshots(&mut self) -> usize {
        let count = self.snapshots.clear();
        log::info!("snapshot: cleared {count}");
        count
    }

    fn rollback_reporting(&mut self, snapshot_id: &str) -> RollbackOutcome {
        match self.rollback_to(snapshot_id) {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("snapshot: automatic rollback to {snapshot_id} failed: {e}");
                RollbackOutcome::failed(e.to_string())
            }
        }
    }

    /// Run `mutation` behind a snapshot. An `Err` rolls the store back to
    /// the pre-mutation state.
    pub fn run_guarded<T, E, F>(&mut self, description: &str, mutation: F) -> GuardedOutcome<T>
    where
        E: Display,
        F: FnOnce(&mut RecordStore) -> Result<T, E>,
    {
        let snapshot_id = self.create_snapshot(&format!("Before: {description}"), OperationType::WebUpdate);
        match mutation(self) {
            Ok(value) => {
                log::info!("snapshot: guarded update committed: {description}");
                self.touch();
                GuardedOutcome::Committed { value, snapshot_id }
            }
            Err(e) => {
                let error = e.to_string();
                log::error!("snapshot: guarded update failed: {description}: {error}");
                let rollback = self.rollback_reporting(&snapshot_id);
                GuardedOutcome::RolledBack { error, snapshot_id, rollback }
            }
        }
    }

    /// Apply `per_item` to each id behind one snapshot. With
    /// `continue_on_error` false the first failure stops the batch and rolls
    /// the store back. A configured pause separates consecutive items.
    pub fn run_batch_guarded<T, E, F>(
        &mut self,
        description:       &str,
        ids:               &[String],
        continue_on_error: bool,
        mut per_item:      F,
    ) -> BatchOutcome
    where
        E: Display,
        F: FnMut(&mut RecordStore, &str) -> Result<T, E>,
    {
        let snapshot_id = self.create_snapshot(&format!("Before batch: {description}"), OperationType::BatchVerify);
        let delay = self.config.snapshots.batch_item_delay();
        let mut outcome = BatchOutcome {
            success:     false,
            processed:   0,
            successful:  0,
            failed:      0,
            errors:      Vec::new(),
            snapshot_id: snapshot_id.clone(),
            rollback:    None,
        };

        log::info!("snapshot: batch started: {description} ({} items)", ids.len());
        for (position, id) in ids.iter().enumerate() {
            match per_item(self, id) {
                Ok(_) => outcome.successful += 1,
                Err(e) => {
                    outcome.failed += 1;
                    let message = format!("Failed to update {id}: {e}");
                    log::error!("snapshot: {message}");
                    outcome.errors.push(message.clone());
                    if !continue_on_error {
                        outcome.errors.push(format!("Batch stopped due to error: {message}"));
                        outcome.rollback = Some(self.rollback_reporting(&snapshot_id));
                        return outcome;
                    }
                }
            }
            outcome.processed += 1;
            if position + 1 < ids.len() && !delay.is_zero() {
                std::thread::sleep(delay);
            }
        }

        // A batch with nothing applied is not a success.
        outcome.success = outcome.successful > 0 && (continue_on_error || outcome.failed == 0);
        self.touch();
        log::info!(
            "snapshot: batch finished: {description} ({}/{} successful)",
            outcome.successful, outcome.processed
        );
        outcome
    }
}
