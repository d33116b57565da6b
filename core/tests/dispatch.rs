//! Escalation dispatcher tests: tier increments, the owed notification
//! per tier, and the once-per-day counting gate.

use chrono::NaiveDate;
use rollcall_core::counter::PersonCounters;
use rollcall_core::engine::RosterEngine;
use rollcall_core::notify::{Notification, NotificationTemplate, RecordingNotifier};
use rollcall_core::roster::{AssignmentDocument, PersonImport, PlanDocument, SectionDocument};
use rollcall_core::types::AttendanceStatus;
use std::sync::{Arc, Mutex};

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 4).unwrap()
}

fn person(name: &str, email: &str) -> PersonImport {
    PersonImport {
        full_name: name.into(),
        mobile: None,
        email: email.into(),
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

/// Three linked people plus one name that resolves to nobody, all on one
/// Wednesday section. Returns the engine, the notifier outbox, and the
/// assignment ids in roster order.
fn seeded_engine() -> (RosterEngine, Arc<Mutex<Vec<Notification>>>, Vec<i64>) {
    let (notifier, outbox) = RecordingNotifier::new();
    let engine = RosterEngine::build_test(day(), Box::new(notifier)).unwrap();
    engine
        .import_people(&[
            person("Aya Hassan", "aya@example.org"),
            person("Omar Farouk", "omar@example.org"),
            person("Mona Adel", "mona@example.org"),
        ])
        .unwrap();
    engine
        .load_roster(&[PlanDocument {
            day: "Wednesday".into(),
            supervisor: "Duty Office".into(),
            team: None,
            sections: vec![SectionDocument {
                name: "Main Gate".into(),
                assignments: vec![
                    duty(1, "Aya Hassan"),
                    duty(2, "Omar Farouk"),
                    duty(3, "Mona Adel"),
                    duty(4, "Visiting Teacher"),
                ],
            }],
        }])
        .unwrap();
    let plan = engine.store().plan_for_day("Wednesday").unwrap().unwrap();
    let ids = engine
        .store()
        .plan_assignments(plan.id)
        .unwrap()
        .iter()
        .map(|a| a.id)
        .collect();
    (engine, outbox, ids)
}

fn count_template(outbox: &Mutex<Vec<Notification>>, template: NotificationTemplate) -> usize {
    outbox
        .lock()
        .unwrap()
        .iter()
        .filter(|n| n.template == template)
        .count()
}

/// A first absence moves the tier to 1 and the dispatch sends the
/// warning template to the person.
#[test]
fn first_absence_escalates_to_warning() {
    let (engine, outbox, ids) = seeded_engine();
    engine
        .submit_attendance(ids[0], day(), AttendanceStatus::Absent, None)
        .unwrap();

    let report = engine.run_dispatch(day()).unwrap();

    let aya = engine
        .store()
        .person_by_email("aya@example.org")
        .unwrap()
        .unwrap();
    assert_eq!(aya.counters.absence_tier, 1, "first absence should set tier 1");
    assert!(report.counted, "first run of the day must count");
    assert_eq!(report.sent, 1);
    assert_eq!(
        count_template(&outbox, NotificationTemplate::AbsenceWarning),
        1,
        "exactly one warning should go out"
    );
}

/// Re-running dispatch on the same date must neither re-increment the
/// tier nor deliver a second notification.
#[test]
fn redispatch_same_day_is_gated() {
    let (engine, outbox, ids) = seeded_engine();
    engine
        .submit_attendance(ids[0], day(), AttendanceStatus::Absent, None)
        .unwrap();
    engine.run_dispatch(day()).unwrap();

    let second = engine.run_dispatch(day()).unwrap();

    let aya = engine
        .store()
        .person_by_email("aya@example.org")
        .unwrap()
        .unwrap();
    assert_eq!(aya.counters.absence_tier, 1, "tier must not double count");
    assert!(!second.counted, "second run must report counting as skipped");
    assert_eq!(second.sent, 0, "notification log should block a re-send");
    assert_eq!(
        count_template(&outbox, NotificationTemplate::AbsenceWarning),
        1
    );
}

/// Tier 2 plus one more absence fires the full-day deduction and resets
/// the axis to 0.
#[test]
fn terminal_absence_sends_full_deduction_and_resets() {
    let (engine, outbox, ids) = seeded_engine();
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
                late_tier: 0,
            },
        )
        .unwrap();
    engine
        .submit_attendance(ids[0], day(), AttendanceStatus::Absent, None)
        .unwrap();

    engine.run_dispatch(day()).unwrap();

    let aya = engine.store().person(aya.id).unwrap();
    assert_eq!(aya.counters.absence_tier, 0, "terminal tier must reset");
    assert_eq!(
        count_template(&outbox, NotificationTemplate::AbsenceFullDayDeduction),
        1
    );
}

/// Lateness escalates on its own axis without touching absence tiers.
#[test]
fn late_axis_escalates_independently() {
    let (engine, outbox, ids) = seeded_engine();
    engine
        .submit_attendance(ids[1], day(), AttendanceStatus::Late, None)
        .unwrap();

    engine.run_dispatch(day()).unwrap();

    let omar = engine
        .store()
        .person_by_email("omar@example.org")
        .unwrap()
        .unwrap();
    assert_eq!(omar.counters.late_tier, 1);
    assert_eq!(omar.counters.absence_tier, 0);
    assert_eq!(count_template(&outbox, NotificationTemplate::LateWarning), 1);
}

/// Two absentees, one linked and one placeholder-only: exactly one
/// notification goes out and exactly one skip is reported.
#[test]
fn placeholder_rows_skip_but_linked_people_notify() {
    let (engine, outbox, ids) = seeded_engine();
    engine
        .submit_attendance(ids[0], day(), AttendanceStatus::Absent, None)
        .unwrap();
    engine
        .submit_attendance(ids[3], day(), AttendanceStatus::Absent, None)
        .unwrap();

    let report = engine.run_dispatch(day()).unwrap();

    assert_eq!(report.sent, 1, "only the linked person gets a notification");
    assert_eq!(report.skipped, 1, "the placeholder must be reported as skipped");
    assert_eq!(report.skips[0].name, "Visiting Teacher");
    assert_eq!(report.skips[0].reason, "no linked person");
    assert_eq!(outbox.lock().unwrap().len(), 1);
}

/// Three consecutive absent days walk the full ladder: warning,
/// half-day deduction, full-day deduction, then back to zero.
#[test]
fn tier_walks_the_deduction_ladder() {
    let (engine, outbox, ids) = seeded_engine();
    for offset in 0..3 {
        let date = day() + chrono::Duration::days(offset);
        engine
            .submit_attendance(ids[0], date, AttendanceStatus::Absent, None)
            .unwrap();
        engine.run_dispatch(date).unwrap();
    }

    let aya = engine
        .store()
        .person_by_email("aya@example.org")
        .unwrap()
        .unwrap();
    assert_eq!(aya.counters.absence_tier, 0, "ladder ends with a reset");
    assert_eq!(
        count_template(&outbox, NotificationTemplate::AbsenceWarning),
        1
    );
    assert_eq!(
        count_template(&outbox, NotificationTemplate::AbsenceHalfDayDeduction),
        1
    );
    assert_eq!(
        count_template(&outbox, NotificationTemplate::AbsenceFullDayDeduction),
        1
    );
}

/// When report recipients are configured, a committed dispatch run mails
/// the absent-today summary once.
#[test]
fn daily_report_goes_to_configured_recipients() {
    let (mut engine_parts, outbox, ids) = seeded_engine();
    engine_parts.config_mut().notifier.report_recipients =
        vec!["head@example.org".into(), "deputy@example.org".into()];
    let engine = engine_parts;

    engine
        .submit_attendance(ids[0], day(), AttendanceStatus::Absent, None)
        .unwrap();
    engine.run_dispatch(day()).unwrap();

    let outbox = outbox.lock().unwrap();
    let reports: Vec<_> = outbox
        .iter()
        .filter(|n| n.template == NotificationTemplate::DailyAbsenceReport)
        .collect();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].recipient, "head@example.org");
    assert_eq!(reports[0].cc, vec!["deputy@example.org".to_string()]);
    assert!(
        reports[0].variables["absent"].contains("Aya Hassan"),
        "report must name the absentees"
    );
}

/// Present records are plumbing, not escalation input.
#[test]
fn present_records_never_count() {
    let (engine, outbox, ids) = seeded_engine();
    engine
        .submit_attendance(ids[0], day(), AttendanceStatus::Present, None)
        .unwrap();

    let report = engine.run_dispatch(day()).unwrap();

    let aya = engine
        .store()
        .person_by_email("aya@example.org")
        .unwrap()
        .unwrap();
    assert_eq!(aya.counters, PersonCounters::default());
    assert_eq!(report.sent, 0);
    assert!(outbox.lock().unwrap().is_empty());
}
