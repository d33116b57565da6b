//! Offline-sync batch types.
//!
//! A client that went offline submits its whole day as one ordered batch.
//! Reconciliation is last-write-wins against current server state — no
//! vector clocks, no three-way merge. The engine applies a batch
//! atomically: either every tuple lands or none do.

use crate::types::{AssignmentId, AttendanceStatus};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncEntry {
    pub assignment_id: AssignmentId,
    /// None clears the record for this assignment on the batch date.
    pub status: Option<AttendanceStatus>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncBatch {
    pub date: NaiveDate,
    pub entries: Vec<SyncEntry>,
}

/// Best-effort notification tallies for a committed batch. Failures here
/// never roll the batch back; they are informational only.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct NotificationTally {
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub batch_id: String,
    pub accepted: usize,
    pub notifications: NotificationTally,
}
