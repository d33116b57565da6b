//! Attendance ledger queries. One row per (assignment, date), enforced
//! by a unique index; upserts overwrite status and notes in place.

use super::RosterStore;
use crate::error::RosterResult;
use crate::types::{AssignmentId, AttendanceStatus, PersonId};
use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct AttendanceRecordRow {
    pub id: i64,
    pub assignment_id: AssignmentId,
    pub status: AttendanceStatus,
    pub notes: Option<String>,
}

/// One joined ledger row as the dispatch run consumes it: the record
/// plus its assignment context and (optional) linked person id.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchRow {
    pub assignment_id: AssignmentId,
    pub status: AttendanceStatus,
    pub notes: Option<String>,
    pub person_id: Option<PersonId>,
    pub placeholder_name: Option<String>,
    pub place_task: Option<String>,
    pub section: String,
    pub day_of_week: String,
    pub supervisor: String,
}

impl RosterStore {
    pub fn attendance_record(
        &self,
        assignment_id: AssignmentId,
        date: NaiveDate,
    ) -> RosterResult<Option<AttendanceRecordRow>> {
        self.conn
            .query_row(
                "SELECT id, assignment_id, status, notes FROM attendance_record
                 WHERE assignment_id = ?1 AND date = ?2",
                params![assignment_id, date.to_string()],
                |row| {
                    Ok(AttendanceRecordRow {
                        id: row.get(0)?,
                        assignment_id: row.get(1)?,
                        status: row.get(2)?,
                        notes: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn upsert_attendance(
        &self,
        assignment_id: AssignmentId,
        date: NaiveDate,
        status: AttendanceStatus,
        notes: Option<&str>,
    ) -> RosterResult<()> {
        self.conn.execute(
            "INSERT INTO attendance_record (assignment_id, date, status, notes)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(assignment_id, date) DO UPDATE SET
                 status = excluded.status,
                 notes = excluded.notes",
            params![assignment_id, date.to_string(), status, notes],
        )?;
        Ok(())
    }

    pub fn delete_attendance(
        &self,
        assignment_id: AssignmentId,
        date: NaiveDate,
    ) -> RosterResult<bool> {
        let rows = self.conn.execute(
            "DELETE FROM attendance_record WHERE assignment_id = ?1 AND date = ?2",
            params![assignment_id, date.to_string()],
        )?;
        Ok(rows > 0)
    }

    /// Today's ledger joined with assignment context, in display order.
    /// Placeholder-only assignments come back with person_id = None.
    pub fn attendance_for_date(&self, date: NaiveDate) -> RosterResult<Vec<DispatchRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT r.assignment_id, r.status, r.notes,
                    a.person_id, a.placeholder_name, a.place_task,
                    s.name, p.day_of_week, p.supervisor
             FROM attendance_record r
             JOIN duty_assignment a ON a.id = r.assignment_id
             JOIN duty_section s ON s.id = a.section_id
             JOIN duty_plan p ON p.id = s.plan_id
             WHERE r.date = ?1
             ORDER BY s.ord, a.ord, a.id",
        )?;
        let rows = stmt.query_map(params![date.to_string()], |row| {
            Ok(DispatchRow {
                assignment_id: row.get(0)?,
                status: row.get(1)?,
                notes: row.get(2)?,
                person_id: row.get(3)?,
                placeholder_name: row.get(4)?,
                place_task: row.get(5)?,
                section: row.get(6)?,
                day_of_week: row.get(7)?,
                supervisor: row.get(8)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn attendance_count_for_date(&self, date: NaiveDate) -> RosterResult<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM attendance_record WHERE date = ?1",
                params![date.to_string()],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }
}
