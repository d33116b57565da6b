//! Roster document tests: people import normalization, name resolution
//! into assignments, wholesale plan reloads, and export.

use chrono::NaiveDate;
use rollcall_core::counter::PersonCounters;
use rollcall_core::engine::RosterEngine;
use rollcall_core::notify::RecordingNotifier;
use rollcall_core::roster::{AssignmentDocument, PersonImport, PlanDocument, SectionDocument};

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 4).unwrap()
}

fn engine() -> RosterEngine {
    let (notifier, _outbox) = RecordingNotifier::new();
    RosterEngine::build_test(day(), Box::new(notifier)).unwrap()
}

fn plan(day: &str, assignments: Vec<AssignmentDocument>) -> PlanDocument {
    PlanDocument {
        day: day.into(),
        supervisor: "Duty Office".into(),
        team: None,
        sections: vec![SectionDocument {
            name: "Main Gate".into(),
            assignments,
        }],
    }
}

fn duty(order: i64, name: &str) -> AssignmentDocument {
    AssignmentDocument {
        order,
        person: Some(name.into()),
        placeholder_name: None,
        place_task: None,
    }
}

/// Hand-edited spreadsheets arrive with stray whitespace and mixed-case
/// emails; import canonicalizes both.
#[test]
fn people_import_normalizes_names_and_emails() {
    let engine = engine();
    let count = engine
        .import_people(&[PersonImport {
            full_name: "  Aya   Hassan ".into(),
            mobile: Some("0100".into()),
            email: " AYA@Example.ORG ".into(),
        }])
        .unwrap();

    assert_eq!(count, 1);
    assert_eq!(engine.store().person_count().unwrap(), 1);
    let aya = engine
        .store()
        .person_by_email("aya@example.org")
        .unwrap()
        .expect("person should be found under the lowercased email");
    assert_eq!(aya.full_name, "Aya Hassan");
}

/// Re-importing the staff list updates contact details but never resets
/// escalation state.
#[test]
fn reimport_preserves_counters() {
    let engine = engine();
    engine
        .import_people(&[PersonImport {
            full_name: "Aya Hassan".into(),
            mobile: None,
            email: "aya@example.org".into(),
        }])
        .unwrap();
    let aya = engine
        .store()
        .person_by_email("aya@example.org")
        .unwrap()
        .unwrap();
    engine
        .override_tiers(
            aya.id,
            PersonCounters {
                absence_tier: 2,
                late_tier: 1,
            },
        )
        .unwrap();

    engine
        .import_people(&[PersonImport {
            full_name: "Aya Hassan".into(),
            mobile: Some("0100".into()),
            email: "aya@example.org".into(),
        }])
        .unwrap();

    let aya = engine.store().person(aya.id).unwrap();
    assert_eq!(aya.counters.absence_tier, 2);
    assert_eq!(aya.counters.late_tier, 1);
    assert_eq!(aya.mobile.as_deref(), Some("0100"));
}

/// Names that resolve to nobody become placeholder assignments rather
/// than import errors.
#[test]
fn unresolved_names_become_placeholders() {
    let engine = engine();
    engine
        .import_people(&[PersonImport {
            full_name: "Aya Hassan".into(),
            mobile: None,
            email: "aya@example.org".into(),
        }])
        .unwrap();
    engine
        .load_roster(&[plan(
            "Monday",
            vec![duty(1, "Aya Hassan"), duty(2, "Ghost Teacher")],
        )])
        .unwrap();

    let stored = engine.store().plan_for_day("Monday").unwrap().unwrap();
    let assignments = engine.store().plan_assignments(stored.id).unwrap();
    assert_eq!(assignments.len(), 2);
    assert!(assignments[0].person_id.is_some());
    assert!(assignments[1].person_id.is_none());
    assert_eq!(
        assignments[1].placeholder_name.as_deref(),
        Some("Ghost Teacher")
    );
}

/// Export reproduces what was loaded, with days in week order.
#[test]
fn export_round_trips_loaded_plans() {
    let engine = engine();
    engine
        .import_people(&[PersonImport {
            full_name: "Aya Hassan".into(),
            mobile: None,
            email: "aya@example.org".into(),
        }])
        .unwrap();
    engine
        .load_roster(&[
            plan("Wednesday", vec![duty(1, "Aya Hassan")]),
            plan("Sunday", vec![duty(1, "Aya Hassan")]),
        ])
        .unwrap();

    let exported = engine.export_roster().unwrap();

    assert_eq!(exported.len(), 2);
    assert_eq!(exported[0].day, "Sunday", "week starts on Sunday");
    assert_eq!(exported[1].day, "Wednesday");
    assert_eq!(exported[1].sections.len(), 1);
    assert_eq!(
        exported[1].sections[0].assignments[0].person.as_deref(),
        Some("Aya Hassan")
    );
}

/// Reloading a day replaces its sections wholesale; other days are left
/// untouched.
#[test]
fn reload_replaces_sections_per_day() {
    let engine = engine();
    engine
        .import_people(&[PersonImport {
            full_name: "Aya Hassan".into(),
            mobile: None,
            email: "aya@example.org".into(),
        }])
        .unwrap();
    engine
        .load_roster(&[
            plan("Monday", vec![duty(1, "Aya Hassan"), duty(2, "Ghost Teacher")]),
            plan("Tuesday", vec![duty(1, "Aya Hassan")]),
        ])
        .unwrap();

    engine
        .load_roster(&[plan("Monday", vec![duty(1, "Aya Hassan")])])
        .unwrap();

    let monday = engine.store().plan_for_day("Monday").unwrap().unwrap();
    assert_eq!(engine.store().plan_assignments(monday.id).unwrap().len(), 1);
    let tuesday = engine.store().plan_for_day("Tuesday").unwrap().unwrap();
    assert_eq!(
        engine.store().plan_assignments(tuesday.id).unwrap().len(),
        1,
        "untouched days keep their assignments"
    );
}

/// The engine resolves today's plan through the day-of-week key; 2026-03-04
/// is a Wednesday.
#[test]
fn todays_plan_resolves_by_weekday() {
    let engine = engine();
    engine
        .import_people(&[PersonImport {
            full_name: "Aya Hassan".into(),
            mobile: None,
            email: "aya@example.org".into(),
        }])
        .unwrap();
    engine
        .load_roster(&[plan("Wednesday", vec![duty(1, "Aya Hassan")])])
        .unwrap();

    let (stored, assignments) = engine.plan_for_today().unwrap();
    assert_eq!(stored.day_of_week, "Wednesday");
    assert_eq!(assignments.len(), 1);
}

/// A day with no stored plan is a domain error, not an empty result.
#[test]
fn missing_plan_for_today_is_an_error() {
    let engine = engine();
    engine
        .load_roster(&[plan("Monday", vec![duty(1, "Nobody")])])
        .unwrap();

    let err = engine.plan_for_today().unwrap_err();
    assert!(
        matches!(err, rollcall_core::error::RosterError::PlanNotFound { ref day } if day == "Wednesday"),
        "expected PlanNotFound for Wednesday, got {err}"
    );
}

/// Individual slots can be removed without reloading the whole day.
#[test]
fn single_assignment_can_be_deleted() {
    let engine = engine();
    engine
        .load_roster(&[plan(
            "Thursday",
            vec![duty(1, "Ghost One"), duty(2, "Ghost Two")],
        )])
        .unwrap();
    let thursday = engine.store().plan_for_day("Thursday").unwrap().unwrap();
    let assignments = engine.store().plan_assignments(thursday.id).unwrap();

    assert!(engine.store().delete_assignment(assignments[0].id).unwrap());
    assert!(
        !engine.store().delete_assignment(assignments[0].id).unwrap(),
        "second delete of the same slot reports nothing removed"
    );
    assert_eq!(
        engine.store().plan_assignments(thursday.id).unwrap().len(),
        1
    );
}
