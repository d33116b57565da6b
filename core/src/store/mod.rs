//! SQLite persistence layer.
//!
//! RULE: Only the store modules talk to the database.
//! Engine code calls store methods — it never executes SQL directly.

use crate::error::RosterResult;
use crate::event::{event_type_name, EventLogEntry, RosterEvent};
use chrono::NaiveDate;
use rusqlite::{params, Connection};

mod attendance;
mod notification;
mod person;
mod plan;

pub use attendance::{AttendanceRecordRow, DispatchRow};
pub use person::PersonRecord;
pub use plan::{AssignmentRecord, PlanRecord, SectionRecord};

pub struct RosterStore {
    conn: Connection,
}

impl RosterStore {
    pub fn open(path: &str) -> RosterResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (:memory: ignores it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> RosterResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> RosterResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_attendance.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_notifications.sql"))?;
        Ok(())
    }

    /// Run `f` inside one transaction. Any error rolls everything back,
    /// so a partially applied batch is never visible.
    pub fn with_transaction<T>(
        &self,
        f: impl FnOnce(&Self) -> RosterResult<T>,
    ) -> RosterResult<T> {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        match f(self) {
            Ok(value) => {
                self.conn.execute_batch("COMMIT")?;
                Ok(value)
            }
            Err(err) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(err)
            }
        }
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(
        &self,
        date: NaiveDate,
        component: &str,
        event: &RosterEvent,
    ) -> RosterResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (date, component, event_type, payload)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                date.to_string(),
                component,
                event_type_name(event),
                serde_json::to_string(event)?,
            ],
        )?;
        Ok(())
    }

    pub fn events_for_date(&self, date: NaiveDate) -> RosterResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, date, component, event_type, payload
             FROM event_log WHERE date = ?1
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![date.to_string()], |row| {
                Ok(EventLogEntry {
                    id: Some(row.get(0)?),
                    date: row.get(1)?,
                    component: row.get(2)?,
                    event_type: row.get(3)?,
                    payload: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn event_count(&self, event_type: &str) -> RosterResult<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM event_log WHERE event_type = ?1",
                params![event_type],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    // ── Dispatch gate ──────────────────────────────────────────

    pub fn dispatch_ran(&self, date: NaiveDate) -> RosterResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM dispatch_log WHERE date = ?1",
            params![date.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn mark_dispatch_ran(&self, date: NaiveDate, run_id: &str) -> RosterResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO dispatch_log (date, run_id) VALUES (?1, ?2)",
            params![date.to_string(), run_id],
        )?;
        Ok(())
    }
}
