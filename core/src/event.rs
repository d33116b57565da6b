//! The audit event log — every engine action leaves a row.
//!
//! RULE: events are appended in the same transaction as the change they
//! describe, so the log never shows a change that was rolled back.
//! Variants are added as the engine grows — never removed or reordered.

use crate::escalation::EscalationAxis;
use crate::types::{AssignmentId, AttendanceStatus, PersonId, Tier};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RosterEvent {
    // ── Ledger events ──────────────────────────────
    RecordUpserted {
        assignment_id: AssignmentId,
        date: NaiveDate,
        previous: Option<AttendanceStatus>,
        status: AttendanceStatus,
    },
    RecordDeleted {
        assignment_id: AssignmentId,
        date: NaiveDate,
        previous: AttendanceStatus,
    },

    // ── Counter events ─────────────────────────────
    TierChanged {
        person_id: PersonId,
        axis: String,
        from: Tier,
        to: Tier,
    },
    TierOverridden {
        person_id: PersonId,
        absence_tier: Tier,
        late_tier: Tier,
    },

    // ── Notification events ────────────────────────
    NotificationSent {
        email: String,
        template: String,
        date: NaiveDate,
    },
    NotificationSkipped {
        email: String,
        reason: String,
        date: NaiveDate,
    },
    NotificationFailed {
        email: String,
        message: String,
        date: NaiveDate,
    },

    // ── Run events ─────────────────────────────────
    DispatchCompleted {
        date: NaiveDate,
        run_id: String,
        counted: bool,
        sent: usize,
        skipped: usize,
        failed: usize,
    },
    BatchSynced {
        date: NaiveDate,
        batch_id: String,
        accepted: usize,
    },
    RosterLoaded {
        plans: usize,
    },
    PeopleImported {
        count: usize,
    },
}

impl RosterEvent {
    pub fn tier_changed(person_id: PersonId, axis: EscalationAxis, from: Tier, to: Tier) -> Self {
        RosterEvent::TierChanged {
            person_id,
            axis: axis.as_str().to_string(),
            from,
            to,
        }
    }
}

/// One persisted row of the event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: Option<i64>,
    pub date: String,
    pub component: String,
    pub event_type: String,
    pub payload: String,
}

/// Extract a stable string name from a RosterEvent variant.
/// Used for the event_type column in event_log.
pub fn event_type_name(event: &RosterEvent) -> &'static str {
    match event {
        RosterEvent::RecordUpserted { .. } => "record_upserted",
        RosterEvent::RecordDeleted { .. } => "record_deleted",
        RosterEvent::TierChanged { .. } => "tier_changed",
        RosterEvent::TierOverridden { .. } => "tier_overridden",
        RosterEvent::NotificationSent { .. } => "notification_sent",
        RosterEvent::NotificationSkipped { .. } => "notification_skipped",
        RosterEvent::NotificationFailed { .. } => "notification_failed",
        RosterEvent::DispatchCompleted { .. } => "dispatch_completed",
        RosterEvent::BatchSynced { .. } => "batch_synced",
        RosterEvent::RosterLoaded { .. } => "roster_loaded",
        RosterEvent::PeopleImported { .. } => "people_imported",
    }
}
