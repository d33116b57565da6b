//! Engine configuration.
//!
//! Everything the original deployment kept as module globals — sender
//! identity, admin cc lists, report recipients, the dispatch hour — is an
//! explicit injected value here. Components receive a config at
//! construction; nothing reads ambient state.

use crate::error::RosterResult;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Sender address stamped on every outbound notification.
    pub from_address: String,
    /// Administrators cc'd on every per-person notification.
    #[serde(default)]
    pub admin_cc: Vec<String>,
    /// Recipients of the aggregate daily absence report.
    #[serde(default)]
    pub report_recipients: Vec<String>,
    /// Email substrings exempt from per-day duplicate suppression.
    /// Empty in production; used to keep a test mailbox flowing.
    #[serde(default)]
    pub duplicate_exempt: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Local wall-clock time "HH:MM" at which the daily dispatch fires.
    pub dispatch_time: String,
    /// Minutes east of UTC used to resolve "today".
    pub utc_offset_minutes: i32,
}

impl ScheduleConfig {
    /// Parse `dispatch_time` into (hour, minute). Malformed values
    /// disable the scheduler rather than firing at a surprise time.
    pub fn dispatch_time_parts(&self) -> Option<(u32, u32)> {
        let (h, m) = self.dispatch_time.split_once(':')?;
        let hour: u32 = h.parse().ok().filter(|v| *v < 24)?;
        let minute: u32 = m.parse().ok().filter(|v| *v < 60)?;
        Some((hour, minute))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterConfig {
    pub database_path: String,
    pub notifier: NotifierConfig,
    pub schedule: ScheduleConfig,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            database_path: "roster.db".to_string(),
            notifier: NotifierConfig {
                from_address: "roster@example.org".to_string(),
                admin_cc: Vec::new(),
                report_recipients: Vec::new(),
                duplicate_exempt: Vec::new(),
            },
            schedule: ScheduleConfig {
                dispatch_time: "16:00".to_string(),
                utc_offset_minutes: 120,
            },
        }
    }
}

impl RosterConfig {
    pub fn from_file(path: &Path) -> RosterResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Ok(serde_json::from_str(&text)?)
    }
}
