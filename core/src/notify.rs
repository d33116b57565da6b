//! The notifier boundary.
//!
//! RULE: transports return explicit outcomes — Sent, Skipped, Failed —
//! never errors. A dead SMTP server must not be able to roll back a
//! committed ledger or counter change. Duplicate suppression is decided
//! before the transport is reached (the engine consults the notification
//! log), so an implementation only ever reports its own delivery result.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationTemplate {
    /// Immediate status notice sent from the sync path.
    AttendanceNotice,
    AbsenceWarning,
    AbsenceHalfDayDeduction,
    AbsenceFullDayDeduction,
    LateWarning,
    LateQuarterDayDeduction,
    LateHalfDayDeduction,
    /// Aggregate absent-today report for administrators.
    DailyAbsenceReport,
}

impl NotificationTemplate {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationTemplate::AttendanceNotice => "attendance_notice",
            NotificationTemplate::AbsenceWarning => "absence_warning",
            NotificationTemplate::AbsenceHalfDayDeduction => "absence_half_day_deduction",
            NotificationTemplate::AbsenceFullDayDeduction => "absence_full_day_deduction",
            NotificationTemplate::LateWarning => "late_warning",
            NotificationTemplate::LateQuarterDayDeduction => "late_quarter_day_deduction",
            NotificationTemplate::LateHalfDayDeduction => "late_half_day_deduction",
            NotificationTemplate::DailyAbsenceReport => "daily_absence_report",
        }
    }
}

/// One templated message handed to a transport. Variables are flat
/// key/value pairs; rendering is the transport's concern.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub template: NotificationTemplate,
    pub recipient: String,
    pub cc: Vec<String>,
    pub variables: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    Skipped { reason: String },
    Failed { message: String },
}

pub trait Notifier: Send {
    fn send(&self, notification: &Notification) -> SendOutcome;
}

/// Log-only transport for headless runs: every notification is written
/// to the log at info level and reported as sent.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, n: &Notification) -> SendOutcome {
        log::info!(
            "notify template={} to={} cc=[{}]",
            n.template.as_str(),
            n.recipient,
            n.cc.join(", ")
        );
        SendOutcome::Sent
    }
}

/// Test transport: records every delivered notification in a shared
/// outbox. Recipients registered via failing_for come back Failed, so
/// partial-failure behavior can be exercised.
#[derive(Default)]
pub struct RecordingNotifier {
    outbox: Arc<Mutex<Vec<Notification>>>,
    fail_recipients: Vec<String>,
}

impl RecordingNotifier {
    pub fn new() -> (Self, Arc<Mutex<Vec<Notification>>>) {
        let outbox = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                outbox: Arc::clone(&outbox),
                fail_recipients: Vec::new(),
            },
            outbox,
        )
    }

    pub fn failing_for(mut self, recipient: &str) -> Self {
        self.fail_recipients.push(recipient.to_string());
        self
    }
}

impl Notifier for RecordingNotifier {
    fn send(&self, n: &Notification) -> SendOutcome {
        if self.fail_recipients.iter().any(|r| r == &n.recipient) {
            return SendOutcome::Failed {
                message: format!("transport refused {}", n.recipient),
            };
        }
        self.outbox.lock().expect("outbox lock").push(n.clone());
        SendOutcome::Sent
    }
}
