//! Notification log queries — the per-person-per-day dedup guarantee
//! lives in the UNIQUE (email, date) index, not in engine bookkeeping.

use super::RosterStore;
use crate::error::RosterResult;
use chrono::NaiveDate;
use rusqlite::params;

impl RosterStore {
    pub fn notification_logged(&self, email: &str, date: NaiveDate) -> RosterResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM notification_log WHERE email = ?1 AND date = ?2",
            params![email, date.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn log_notification(
        &self,
        email: &str,
        date: NaiveDate,
        template: &str,
    ) -> RosterResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO notification_log (email, date, template)
             VALUES (?1, ?2, ?3)",
            params![email, date.to_string(), template],
        )?;
        Ok(())
    }

    pub fn notification_count_for_date(&self, date: NaiveDate) -> RosterResult<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM notification_log WHERE date = ?1",
                params![date.to_string()],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }
}
