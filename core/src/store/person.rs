//! Person table queries. Tier columns are written only through set_tiers,
//! which the engine reaches via the counter engine or the admin override.

use super::RosterStore;
use crate::counter::PersonCounters;
use crate::error::{RosterError, RosterResult};
use crate::types::PersonId;
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonRecord {
    pub id: PersonId,
    pub full_name: String,
    pub mobile: Option<String>,
    pub email: String,
    pub counters: PersonCounters,
}

fn person_row_mapper(row: &Row<'_>) -> rusqlite::Result<PersonRecord> {
    Ok(PersonRecord {
        id: row.get(0)?,
        full_name: row.get(1)?,
        mobile: row.get(2)?,
        email: row.get(3)?,
        counters: PersonCounters {
            absence_tier: row.get::<_, i64>(4)? as u8,
            late_tier: row.get::<_, i64>(5)? as u8,
        },
    })
}

const PERSON_COLUMNS: &str = "id, full_name, mobile, email, absence_tier, late_tier";

impl RosterStore {
    /// Insert or update a person keyed by email. Counters are preserved
    /// on update — re-importing a roster never resets escalation state.
    pub fn upsert_person(
        &self,
        full_name: &str,
        mobile: Option<&str>,
        email: &str,
    ) -> RosterResult<PersonId> {
        self.conn.execute(
            "INSERT INTO person (full_name, mobile, email) VALUES (?1, ?2, ?3)
             ON CONFLICT(email) DO UPDATE SET
                 full_name = excluded.full_name,
                 mobile = excluded.mobile",
            params![full_name, mobile, email],
        )?;
        let id = self.conn.query_row(
            "SELECT id FROM person WHERE email = ?1",
            params![email],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    pub fn person(&self, id: PersonId) -> RosterResult<PersonRecord> {
        self.conn
            .query_row(
                &format!("SELECT {PERSON_COLUMNS} FROM person WHERE id = ?1"),
                params![id],
                person_row_mapper,
            )
            .optional()?
            .ok_or(RosterError::UnknownPerson { id })
    }

    pub fn person_by_email(&self, email: &str) -> RosterResult<Option<PersonRecord>> {
        self.conn
            .query_row(
                &format!("SELECT {PERSON_COLUMNS} FROM person WHERE email = ?1"),
                params![email],
                person_row_mapper,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Case-insensitive full-name lookup, used when resolving roster
    /// documents against imported people. Stored names are already
    /// whitespace-normalized at import time.
    pub fn person_by_name(&self, normalized_name: &str) -> RosterResult<Option<PersonRecord>> {
        self.conn
            .query_row(
                &format!("SELECT {PERSON_COLUMNS} FROM person WHERE lower(full_name) = lower(?1)"),
                params![normalized_name],
                person_row_mapper,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn set_tiers(&self, id: PersonId, counters: PersonCounters) -> RosterResult<()> {
        let rows = self.conn.execute(
            "UPDATE person SET absence_tier = ?1, late_tier = ?2 WHERE id = ?3",
            params![counters.absence_tier as i64, counters.late_tier as i64, id],
        )?;
        if rows == 0 {
            return Err(RosterError::UnknownPerson { id });
        }
        Ok(())
    }

    pub fn reset_all_tiers(&self) -> RosterResult<usize> {
        let rows = self.conn.execute(
            "UPDATE person SET absence_tier = 0, late_tier = 0
             WHERE absence_tier != 0 OR late_tier != 0",
            [],
        )?;
        Ok(rows)
    }

    pub fn list_people(&self) -> RosterResult<Vec<PersonRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PERSON_COLUMNS} FROM person ORDER BY full_name"
        ))?;
        let rows = stmt.query_map([], person_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn person_count(&self) -> RosterResult<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM person", [], |row| row.get(0))
            .map_err(Into::into)
    }
}
