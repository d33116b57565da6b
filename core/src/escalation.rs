//! Escalation tiers: which notification a freshly counted tier owes,
//! and the report a dispatch run hands back to its caller.

use crate::notify::NotificationTemplate;
use crate::types::{Tier, TERMINAL_TIER};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationAxis {
    Absence,
    Late,
}

impl EscalationAxis {
    pub fn as_str(&self) -> &'static str {
        match self {
            EscalationAxis::Absence => "absence",
            EscalationAxis::Late => "late",
        }
    }
}

/// Map a tier to the single notification owed for it.
/// Tier 0 owes nothing — the record never counted, or was corrected away.
pub fn template_for(axis: EscalationAxis, tier: Tier) -> Option<NotificationTemplate> {
    match (axis, tier) {
        (_, 0) => None,
        (EscalationAxis::Absence, 1) => Some(NotificationTemplate::AbsenceWarning),
        (EscalationAxis::Absence, 2) => Some(NotificationTemplate::AbsenceHalfDayDeduction),
        (EscalationAxis::Absence, _) => Some(NotificationTemplate::AbsenceFullDayDeduction),
        (EscalationAxis::Late, 1) => Some(NotificationTemplate::LateWarning),
        (EscalationAxis::Late, 2) => Some(NotificationTemplate::LateQuarterDayDeduction),
        (EscalationAxis::Late, _) => Some(NotificationTemplate::LateHalfDayDeduction),
    }
}

/// True when this tier fires the terminal notification and the axis resets.
pub fn is_terminal(tier: Tier) -> bool {
    tier >= TERMINAL_TIER
}

#[derive(Debug, Clone, Serialize)]
pub struct SkipEntry {
    pub name: String,
    pub reason: String,
}

/// Aggregate outcome of one dispatch run, for the UI/CLI/scheduler.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub date: NaiveDate,
    pub run_id: String,
    /// False when the increment pass was already gated off for this date.
    pub counted: bool,
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
    pub sent_by_template: BTreeMap<&'static str, usize>,
    pub skips: Vec<SkipEntry>,
    pub failures: Vec<String>,
}

impl DispatchReport {
    pub fn new(date: NaiveDate, run_id: String, counted: bool) -> Self {
        Self {
            date,
            run_id,
            counted,
            sent: 0,
            skipped: 0,
            failed: 0,
            sent_by_template: BTreeMap::new(),
            skips: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn record_sent(&mut self, template: NotificationTemplate) {
        self.sent += 1;
        *self.sent_by_template.entry(template.as_str()).or_insert(0) += 1;
    }

    pub fn record_skip(&mut self, name: &str, reason: &str) {
        self.skipped += 1;
        self.skips.push(SkipEntry {
            name: name.to_string(),
            reason: reason.to_string(),
        });
    }

    pub fn record_failure(&mut self, message: String) {
        self.failed += 1;
        self.failures.push(message);
    }
}
