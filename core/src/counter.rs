//! The counter engine — sole mutator of per-person escalation tiers.
//!
//! RULE: `absence_tier` and `late_tier` change only as a function of a
//! (previous, new) status pair, through apply_transition. The one
//! exception is the explicit administrative override, which fires no
//! notification. The two axes are independent of each other.

use crate::types::{AttendanceStatus, Tier, TERMINAL_TIER};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonCounters {
    pub absence_tier: Tier,
    pub late_tier: Tier,
}

/// Apply one attendance transition to a person's counters.
///
/// `None` means the record is absent from the ledger (deleted, or never
/// created). A transition with previous == new is a no-op: repeated
/// submission of the same status must never double-count.
pub fn apply_transition(
    counters: &mut PersonCounters,
    previous: Option<AttendanceStatus>,
    new: Option<AttendanceStatus>,
) {
    use AttendanceStatus::{Absent, Late, Present};

    if previous == new {
        return;
    }
    if previous == Some(Absent) && matches!(new, Some(Present) | None) {
        counters.absence_tier = counters.absence_tier.saturating_sub(1);
    }
    if previous == Some(Late) && matches!(new, Some(Present) | None) {
        counters.late_tier = counters.late_tier.saturating_sub(1);
    }
    if new == Some(Absent) {
        counters.absence_tier = (counters.absence_tier + 1).min(TERMINAL_TIER);
    }
    if new == Some(Late) {
        counters.late_tier = (counters.late_tier + 1).min(TERMINAL_TIER);
    }
}
