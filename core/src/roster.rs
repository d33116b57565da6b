//! Roster documents — JSON import/export of plans, sections, and
//! assignments, plus the people list.
//!
//! Spreadsheet parsing lives outside this crate; what arrives here is the
//! already-parsed document. Person names in a document are resolved
//! against the person table (case- and whitespace-insensitive); names
//! that resolve to nobody become placeholder assignments, which the
//! dispatcher will skip and report.

use crate::error::RosterResult;
use crate::store::RosterStore;
use serde::{Deserialize, Serialize};

/// Day names in roster display order (week starts Sunday, as the
/// original duty plans were laid out).
pub const DAY_ORDER: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanDocument {
    pub day: String,
    #[serde(default)]
    pub supervisor: String,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub sections: Vec<SectionDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionDocument {
    pub name: String,
    #[serde(default)]
    pub assignments: Vec<AssignmentDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentDocument {
    #[serde(default)]
    pub order: i64,
    /// Full name of a linked person; falls back to a placeholder when
    /// no imported person matches.
    #[serde(default)]
    pub person: Option<String>,
    #[serde(default)]
    pub placeholder_name: Option<String>,
    #[serde(default)]
    pub place_task: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonImport {
    pub full_name: String,
    #[serde(default)]
    pub mobile: Option<String>,
    pub email: String,
}

/// Collapse runs of whitespace; imported documents are full of double
/// spaces from hand-edited spreadsheets.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Upsert people keyed by lowercased email. Rows without a usable name
/// or email are skipped. Returns the number of rows taken.
pub fn import_people(store: &RosterStore, rows: &[PersonImport]) -> RosterResult<usize> {
    let mut count = 0;
    for row in rows {
        let full_name = normalize_name(&row.full_name);
        let email = row.email.trim().to_lowercase();
        if full_name.is_empty() || email.is_empty() {
            continue;
        }
        store.upsert_person(&full_name, row.mobile.as_deref(), &email)?;
        count += 1;
    }
    Ok(count)
}

/// Load a roster document. Existing sections of each named plan are
/// replaced wholesale (cascading out their assignments and attendance
/// records); plans not named in the document are left alone.
pub fn load_roster(store: &RosterStore, document: &[PlanDocument]) -> RosterResult<usize> {
    for plan_doc in document {
        let plan_id =
            store.upsert_plan(&plan_doc.day, &plan_doc.supervisor, plan_doc.team.as_deref())?;
        store.clear_plan_sections(plan_id)?;
        for (index, section_doc) in plan_doc.sections.iter().enumerate() {
            let section_id = store.insert_section(plan_id, &section_doc.name, (index + 1) as i64)?;
            for assignment_doc in &section_doc.assignments {
                let (person_id, placeholder) = match &assignment_doc.person {
                    Some(name) => {
                        let normalized = normalize_name(name);
                        match store.person_by_name(&normalized)? {
                            Some(person) => (Some(person.id), None),
                            None => (None, Some(normalized)),
                        }
                    }
                    None => (None, assignment_doc.placeholder_name.clone()),
                };
                store.insert_assignment(
                    section_id,
                    person_id,
                    placeholder.as_deref(),
                    assignment_doc.order,
                    assignment_doc.place_task.as_deref(),
                )?;
            }
        }
    }
    Ok(document.len())
}

/// Serialize the current roster back into document form, day-ordered.
pub fn export_roster(store: &RosterStore) -> RosterResult<Vec<PlanDocument>> {
    let mut plans = store.list_plans()?;
    plans.sort_by_key(|p| {
        DAY_ORDER
            .iter()
            .position(|d| *d == p.day_of_week)
            .unwrap_or(DAY_ORDER.len())
    });

    let mut documents = Vec::with_capacity(plans.len());
    for plan in plans {
        let mut sections = Vec::new();
        for section in store.sections_for_plan(plan.id)? {
            let mut assignments = Vec::new();
            for assignment in store.assignments_for_section(section.id)? {
                let person = match assignment.person_id {
                    Some(id) => Some(store.person(id)?.full_name),
                    None => None,
                };
                assignments.push(AssignmentDocument {
                    order: assignment.ord,
                    person,
                    placeholder_name: assignment.placeholder_name,
                    place_task: assignment.place_task,
                });
            }
            sections.push(SectionDocument {
                name: section.name,
                assignments,
            });
        }
        documents.push(PlanDocument {
            day: plan.day_of_week,
            supervisor: plan.supervisor,
            team: plan.team,
            sections,
        });
    }
    Ok(documents)
}
