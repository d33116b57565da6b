//! Duty plan, section, and assignment queries.
//!
//! Ownership is unidirectional: a plan owns its sections, a section owns
//! its assignments, and deletes cascade downward (assignments take their
//! attendance records with them). Person links are plain nullable keys.

use super::RosterStore;
use crate::error::RosterResult;
use crate::types::{AssignmentId, PersonId, PlanId, SectionId};
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRecord {
    pub id: PlanId,
    pub day_of_week: String,
    pub supervisor: String,
    pub team: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionRecord {
    pub id: SectionId,
    pub plan_id: PlanId,
    pub name: String,
    pub ord: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub id: AssignmentId,
    pub section_id: SectionId,
    pub person_id: Option<PersonId>,
    pub placeholder_name: Option<String>,
    pub ord: i64,
    pub place_task: Option<String>,
}

fn assignment_row_mapper(row: &Row<'_>) -> rusqlite::Result<AssignmentRecord> {
    Ok(AssignmentRecord {
        id: row.get(0)?,
        section_id: row.get(1)?,
        person_id: row.get(2)?,
        placeholder_name: row.get(3)?,
        ord: row.get(4)?,
        place_task: row.get(5)?,
    })
}

const ASSIGNMENT_COLUMNS: &str =
    "id, section_id, person_id, placeholder_name, ord, place_task";

impl RosterStore {
    // ── Plans ──────────────────────────────────────────────────

    pub fn upsert_plan(
        &self,
        day_of_week: &str,
        supervisor: &str,
        team: Option<&str>,
    ) -> RosterResult<PlanId> {
        self.conn.execute(
            "INSERT INTO duty_plan (day_of_week, supervisor, team) VALUES (?1, ?2, ?3)
             ON CONFLICT(day_of_week) DO UPDATE SET
                 supervisor = excluded.supervisor,
                 team = excluded.team",
            params![day_of_week, supervisor, team],
        )?;
        let id = self.conn.query_row(
            "SELECT id FROM duty_plan WHERE day_of_week = ?1",
            params![day_of_week],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    pub fn plan_for_day(&self, day_of_week: &str) -> RosterResult<Option<PlanRecord>> {
        self.conn
            .query_row(
                "SELECT id, day_of_week, supervisor, team FROM duty_plan WHERE day_of_week = ?1",
                params![day_of_week],
                |row| {
                    Ok(PlanRecord {
                        id: row.get(0)?,
                        day_of_week: row.get(1)?,
                        supervisor: row.get(2)?,
                        team: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn list_plans(&self) -> RosterResult<Vec<PlanRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, day_of_week, supervisor, team FROM duty_plan ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(PlanRecord {
                id: row.get(0)?,
                day_of_week: row.get(1)?,
                supervisor: row.get(2)?,
                team: row.get(3)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Drop all sections (and, via cascade, assignments and their
    /// attendance records) for a plan. Roster reloads replace wholesale.
    pub fn clear_plan_sections(&self, plan_id: PlanId) -> RosterResult<()> {
        self.conn.execute(
            "DELETE FROM duty_section WHERE plan_id = ?1",
            params![plan_id],
        )?;
        Ok(())
    }

    // ── Sections ───────────────────────────────────────────────

    pub fn insert_section(
        &self,
        plan_id: PlanId,
        name: &str,
        ord: i64,
    ) -> RosterResult<SectionId> {
        self.conn.execute(
            "INSERT INTO duty_section (plan_id, name, ord) VALUES (?1, ?2, ?3)",
            params![plan_id, name, ord],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn sections_for_plan(&self, plan_id: PlanId) -> RosterResult<Vec<SectionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, plan_id, name, ord FROM duty_section
             WHERE plan_id = ?1 ORDER BY ord, id",
        )?;
        let rows = stmt.query_map(params![plan_id], |row| {
            Ok(SectionRecord {
                id: row.get(0)?,
                plan_id: row.get(1)?,
                name: row.get(2)?,
                ord: row.get(3)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ── Assignments ────────────────────────────────────────────

    pub fn insert_assignment(
        &self,
        section_id: SectionId,
        person_id: Option<PersonId>,
        placeholder_name: Option<&str>,
        ord: i64,
        place_task: Option<&str>,
    ) -> RosterResult<AssignmentId> {
        self.conn.execute(
            "INSERT INTO duty_assignment (section_id, person_id, placeholder_name, ord, place_task)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![section_id, person_id, placeholder_name, ord, place_task],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn assignment(&self, id: AssignmentId) -> RosterResult<Option<AssignmentRecord>> {
        self.conn
            .query_row(
                &format!("SELECT {ASSIGNMENT_COLUMNS} FROM duty_assignment WHERE id = ?1"),
                params![id],
                assignment_row_mapper,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn delete_assignment(&self, id: AssignmentId) -> RosterResult<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM duty_assignment WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    pub fn assignments_for_section(
        &self,
        section_id: SectionId,
    ) -> RosterResult<Vec<AssignmentRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM duty_assignment
             WHERE section_id = ?1 ORDER BY ord, id"
        ))?;
        let rows = stmt.query_map(params![section_id], assignment_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// All assignments for a plan in display order (section, then slot).
    pub fn plan_assignments(&self, plan_id: PlanId) -> RosterResult<Vec<AssignmentRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT a.id, a.section_id, a.person_id, a.placeholder_name, a.ord, a.place_task
             FROM duty_assignment a
             JOIN duty_section s ON s.id = a.section_id
             WHERE s.plan_id = ?1
             ORDER BY s.ord, a.ord, a.id",
        )?;
        let rows = stmt.query_map(params![plan_id], assignment_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
