//! Shared primitive types used across the record store.

use chrono::{DateTime, Utc};

/// A stable, unique identifier for any stored entity.
pub type EntityId = String;

/// A calendar date kept in its imported text form (ISO `YYYY-MM-DD` once
/// reconciled). Imported data is messy, so dates stay textual until the
/// reconciliation pass standardizes them.
pub type DateText = String;

/// Wall-clock instant used for `createdAt` / `updatedAt` stamps.
pub type Timestamp = DateTime<Utc>;

/// Identifier of a rollback snapshot.
pub type SnapshotId = String;
