//! The engine façade: one struct owning the store, the clock, the
//! notifier transport, and the config, exposing every operation the CLI
//! and tests drive.
//!
//! RULE: state changes commit before notifications go out. The ledger
//! and counters are transactional; delivery is best-effort and its
//! outcome is recorded, never propagated as an error.

use crate::clock::RosterClock;
use crate::config::RosterConfig;
use crate::counter::{apply_transition, PersonCounters};
use crate::error::{RosterError, RosterResult};
use crate::escalation::{is_terminal, template_for, DispatchReport, EscalationAxis};
use crate::event::RosterEvent;
use crate::notify::{Notification, NotificationTemplate, Notifier, SendOutcome};
use crate::roster::{self, PersonImport, PlanDocument};
use crate::store::{AssignmentRecord, PersonRecord, PlanRecord, RosterStore};
use crate::sync::{NotificationTally, SyncBatch, SyncOutcome};
use crate::types::{AssignmentId, AttendanceStatus, PersonId, Tier};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;
use uuid::Uuid;

/// One person owed an escalation notification after an increment pass.
struct PendingEscalation {
    person: PersonRecord,
    axis: EscalationAxis,
    tier: Tier,
}

pub struct RosterEngine {
    config: RosterConfig,
    store: RosterStore,
    clock: RosterClock,
    notifier: Box<dyn Notifier>,
}

impl RosterEngine {
    pub fn new(config: RosterConfig, notifier: Box<dyn Notifier>) -> RosterResult<Self> {
        let store = RosterStore::open(&config.database_path)?;
        store.migrate()?;
        let clock = RosterClock::new(config.schedule.utc_offset_minutes);
        Ok(Self {
            config,
            store,
            clock,
            notifier,
        })
    }

    /// In-memory engine pinned to one date. Every integration test
    /// starts here.
    pub fn build_test(today: NaiveDate, notifier: Box<dyn Notifier>) -> RosterResult<Self> {
        let store = RosterStore::in_memory()?;
        store.migrate()?;
        Ok(Self {
            config: RosterConfig::default(),
            store,
            clock: RosterClock::fixed(today),
            notifier,
        })
    }

    pub fn store(&self) -> &RosterStore {
        &self.store
    }

    pub fn config(&self) -> &RosterConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut RosterConfig {
        &mut self.config
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn local_now(&self) -> NaiveDateTime {
        self.clock.local_now()
    }

    // ── Attendance ledger ──────────────────────────────────────

    /// Record or overwrite one attendance tuple. Counters move only if
    /// the day's dispatch has already run; before that, the dispatch
    /// pass will count whatever the ledger says at its moment, and the
    /// dispatch owns the notification for it.
    pub fn submit_attendance(
        &self,
        assignment_id: AssignmentId,
        date: NaiveDate,
        status: AttendanceStatus,
        notes: Option<&str>,
    ) -> RosterResult<()> {
        let assignment = self
            .store
            .assignment(assignment_id)?
            .ok_or(RosterError::UnknownAssignment { id: assignment_id })?;
        let previous = self
            .store
            .attendance_record(assignment_id, date)?
            .map(|r| r.status);
        let dispatched = self.store.dispatch_ran(date)?;

        self.store.with_transaction(|tx| {
            tx.upsert_attendance(assignment_id, date, status, notes)?;
            tx.append_event(
                date,
                "ledger",
                &RosterEvent::RecordUpserted {
                    assignment_id,
                    date,
                    previous,
                    status,
                },
            )?;
            if dispatched {
                if let Some(person_id) = assignment.person_id {
                    self.transition_person(tx, person_id, date, previous, Some(status))?;
                }
            }
            Ok(())
        })
    }

    /// Remove a record. After dispatch this behaves like a correction to
    /// nothing, decrementing the axis the record had counted against.
    pub fn delete_attendance(
        &self,
        assignment_id: AssignmentId,
        date: NaiveDate,
    ) -> RosterResult<bool> {
        let assignment = self
            .store
            .assignment(assignment_id)?
            .ok_or(RosterError::UnknownAssignment { id: assignment_id })?;
        let previous = match self.store.attendance_record(assignment_id, date)? {
            Some(record) => record.status,
            None => return Ok(false),
        };
        let dispatched = self.store.dispatch_ran(date)?;

        self.store.with_transaction(|tx| {
            tx.delete_attendance(assignment_id, date)?;
            tx.append_event(
                date,
                "ledger",
                &RosterEvent::RecordDeleted {
                    assignment_id,
                    date,
                    previous,
                },
            )?;
            if dispatched {
                if let Some(person_id) = assignment.person_id {
                    self.transition_person(tx, person_id, date, Some(previous), None)?;
                }
            }
            Ok(())
        })?;
        Ok(true)
    }

    // ── Offline sync ───────────────────────────────────────────

    /// Apply an offline batch atomically. Every assignment id is checked
    /// before any write; one unknown id rejects the whole batch. Status
    /// notices for the batch's absent/late people go out only after the
    /// batch has committed.
    pub fn apply_sync_batch(&self, batch: &SyncBatch) -> RosterResult<SyncOutcome> {
        for entry in &batch.entries {
            if self.store.assignment(entry.assignment_id)?.is_none() {
                return Err(RosterError::UnknownAssignment {
                    id: entry.assignment_id,
                });
            }
        }

        let batch_id = Uuid::new_v4().to_string();
        let dispatched = self.store.dispatch_ran(batch.date)?;
        // Last write wins within the batch: only the final status per
        // person decides whether a notice goes out.
        let mut final_status: BTreeMap<PersonId, Option<AttendanceStatus>> = BTreeMap::new();

        self.store.with_transaction(|tx| {
            for entry in &batch.entries {
                let assignment =
                    tx.assignment(entry.assignment_id)?
                        .ok_or(RosterError::UnknownAssignment {
                            id: entry.assignment_id,
                        })?;
                let previous = tx
                    .attendance_record(entry.assignment_id, batch.date)?
                    .map(|r| r.status);

                match entry.status {
                    Some(status) => {
                        tx.upsert_attendance(
                            entry.assignment_id,
                            batch.date,
                            status,
                            entry.notes.as_deref(),
                        )?;
                        tx.append_event(
                            batch.date,
                            "sync",
                            &RosterEvent::RecordUpserted {
                                assignment_id: entry.assignment_id,
                                date: batch.date,
                                previous,
                                status,
                            },
                        )?;
                    }
                    None => {
                        if let Some(previous) = previous {
                            tx.delete_attendance(entry.assignment_id, batch.date)?;
                            tx.append_event(
                                batch.date,
                                "sync",
                                &RosterEvent::RecordDeleted {
                                    assignment_id: entry.assignment_id,
                                    date: batch.date,
                                    previous,
                                },
                            )?;
                        }
                    }
                }

                if let Some(person_id) = assignment.person_id {
                    if dispatched {
                        self.transition_person(tx, person_id, batch.date, previous, entry.status)?;
                    }
                    final_status.insert(person_id, entry.status);
                }
            }
            tx.append_event(
                batch.date,
                "sync",
                &RosterEvent::BatchSynced {
                    date: batch.date,
                    batch_id: batch_id.clone(),
                    accepted: batch.entries.len(),
                },
            )?;
            Ok(())
        })?;

        let mut tally = NotificationTally::default();
        for (person_id, status) in final_status {
            let status = match status {
                Some(s @ (AttendanceStatus::Absent | AttendanceStatus::Late)) => s,
                _ => continue,
            };
            let person = self.store.person(person_id)?;
            let mut variables = BTreeMap::new();
            variables.insert("name".to_string(), person.full_name.clone());
            variables.insert("date".to_string(), batch.date.to_string());
            variables.insert("status".to_string(), status.to_string());
            match self.notify_person(
                &person.email,
                NotificationTemplate::AttendanceNotice,
                batch.date,
                variables,
            )? {
                SendOutcome::Sent => tally.sent += 1,
                SendOutcome::Skipped { .. } => tally.skipped += 1,
                SendOutcome::Failed { .. } => tally.failed += 1,
            }
        }

        Ok(SyncOutcome {
            batch_id,
            accepted: batch.entries.len(),
            notifications: tally,
        })
    }

    // ── Daily dispatch ─────────────────────────────────────────

    /// The end-of-day run. The first run for a date increments counters
    /// for every absent/late record and fires the owed tier
    /// notifications; later runs for the same date fire nothing new (the
    /// notification log blocks repeats) and report what they skipped.
    pub fn run_dispatch(&self, date: NaiveDate) -> RosterResult<DispatchReport> {
        let first_run = !self.store.dispatch_ran(date)?;
        let run_id = Uuid::new_v4().to_string();
        let mut report = DispatchReport::new(date, run_id.clone(), first_run);
        let rows = self.store.attendance_for_date(date)?;

        let mut pending: Vec<PendingEscalation> = Vec::new();
        let mut absent_names: Vec<String> = Vec::new();

        if first_run {
            self.store.with_transaction(|tx| {
                for row in &rows {
                    let axis = match row.status {
                        AttendanceStatus::Present => continue,
                        AttendanceStatus::Absent => EscalationAxis::Absence,
                        AttendanceStatus::Late => EscalationAxis::Late,
                    };
                    let person_id = match row.person_id {
                        Some(id) => id,
                        None => {
                            let name = row
                                .placeholder_name
                                .clone()
                                .unwrap_or_else(|| format!("assignment {}", row.assignment_id));
                            report.record_skip(&name, "no linked person");
                            continue;
                        }
                    };
                    let person = tx.person(person_id)?;
                    let before = person.counters;
                    let mut after = before;
                    apply_transition(&mut after, None, Some(row.status));
                    let (from, tier) = match axis {
                        EscalationAxis::Absence => (before.absence_tier, after.absence_tier),
                        EscalationAxis::Late => (before.late_tier, after.late_tier),
                    };
                    tx.append_event(
                        date,
                        "counter",
                        &RosterEvent::tier_changed(person_id, axis, from, tier),
                    )?;
                    // Terminal tier resets immediately; the deduction
                    // notification still references the tier it closed out.
                    if is_terminal(tier) {
                        match axis {
                            EscalationAxis::Absence => after.absence_tier = 0,
                            EscalationAxis::Late => after.late_tier = 0,
                        }
                        tx.append_event(
                            date,
                            "counter",
                            &RosterEvent::tier_changed(person_id, axis, tier, 0),
                        )?;
                    }
                    tx.set_tiers(person_id, after)?;
                    if row.status == AttendanceStatus::Absent {
                        absent_names.push(person.full_name.clone());
                    }
                    pending.push(PendingEscalation { person, axis, tier });
                }
                tx.mark_dispatch_ran(date, &run_id)?;
                Ok(())
            })?;

            for item in &pending {
                let template = match template_for(item.axis, item.tier) {
                    Some(t) => t,
                    None => continue,
                };
                let mut variables = BTreeMap::new();
                variables.insert("name".to_string(), item.person.full_name.clone());
                variables.insert("date".to_string(), date.to_string());
                variables.insert("tier".to_string(), item.tier.to_string());
                match self.notify_person(&item.person.email, template, date, variables)? {
                    SendOutcome::Sent => report.record_sent(template),
                    SendOutcome::Skipped { reason } => {
                        report.record_skip(&item.person.full_name, &reason)
                    }
                    SendOutcome::Failed { message } => report
                        .record_failure(format!("{}: {}", item.person.full_name, message)),
                }
            }

            self.send_daily_report(date, &absent_names, &mut report)?;
        } else {
            // Re-run: no counting, and the notification log keeps every
            // already-notified address quiet.
            for row in &rows {
                let axis = match row.status {
                    AttendanceStatus::Present => continue,
                    AttendanceStatus::Absent => EscalationAxis::Absence,
                    AttendanceStatus::Late => EscalationAxis::Late,
                };
                let person_id = match row.person_id {
                    Some(id) => id,
                    None => {
                        let name = row
                            .placeholder_name
                            .clone()
                            .unwrap_or_else(|| format!("assignment {}", row.assignment_id));
                        report.record_skip(&name, "no linked person");
                        continue;
                    }
                };
                let person = self.store.person(person_id)?;
                let tier = match axis {
                    EscalationAxis::Absence => person.counters.absence_tier,
                    EscalationAxis::Late => person.counters.late_tier,
                };
                let template = match template_for(axis, tier) {
                    Some(t) => t,
                    None => {
                        report.record_skip(&person.full_name, "no pending escalation");
                        continue;
                    }
                };
                let mut variables = BTreeMap::new();
                variables.insert("name".to_string(), person.full_name.clone());
                variables.insert("date".to_string(), date.to_string());
                variables.insert("tier".to_string(), tier.to_string());
                match self.notify_person(&person.email, template, date, variables)? {
                    SendOutcome::Sent => report.record_sent(template),
                    SendOutcome::Skipped { reason } => {
                        report.record_skip(&person.full_name, &reason)
                    }
                    SendOutcome::Failed { message } => {
                        report.record_failure(format!("{}: {}", person.full_name, message))
                    }
                }
            }
        }

        self.store.append_event(
            date,
            "dispatch",
            &RosterEvent::DispatchCompleted {
                date,
                run_id: report.run_id.clone(),
                counted: report.counted,
                sent: report.sent,
                skipped: report.skipped,
                failed: report.failed,
            },
        )?;
        log::info!(
            "dispatch {} counted={} sent={} skipped={} failed={}",
            date,
            report.counted,
            report.sent,
            report.skipped,
            report.failed
        );
        Ok(report)
    }

    /// Aggregate absent-today mail for administrators. Goes out once per
    /// date (first run only), bypassing the per-person dedup log.
    fn send_daily_report(
        &self,
        date: NaiveDate,
        absent_names: &[String],
        report: &mut DispatchReport,
    ) -> RosterResult<()> {
        let recipients = &self.config.notifier.report_recipients;
        if recipients.is_empty() || absent_names.is_empty() {
            return Ok(());
        }
        let mut variables = BTreeMap::new();
        variables.insert("date".to_string(), date.to_string());
        variables.insert("absent".to_string(), absent_names.join(", "));
        variables.insert("count".to_string(), absent_names.len().to_string());
        let notification = Notification {
            template: NotificationTemplate::DailyAbsenceReport,
            recipient: recipients[0].clone(),
            cc: recipients[1..].to_vec(),
            variables,
        };
        match self.notifier.send(&notification) {
            SendOutcome::Sent => {
                report.record_sent(NotificationTemplate::DailyAbsenceReport);
                self.store.append_event(
                    date,
                    "notifier",
                    &RosterEvent::NotificationSent {
                        email: notification.recipient.clone(),
                        template: NotificationTemplate::DailyAbsenceReport.as_str().to_string(),
                        date,
                    },
                )?;
            }
            SendOutcome::Skipped { reason } => report.record_skip("daily report", &reason),
            SendOutcome::Failed { message } => {
                log::error!("daily report failed: {message}");
                report.record_failure(format!("daily report: {message}"));
                self.store.append_event(
                    date,
                    "notifier",
                    &RosterEvent::NotificationFailed {
                        email: notification.recipient.clone(),
                        message,
                        date,
                    },
                )?;
            }
        }
        Ok(())
    }

    // ── Counters ───────────────────────────────────────────────

    /// Administrative override. Sets both axes exactly as given and
    /// fires no notification.
    pub fn override_tiers(&self, person_id: PersonId, counters: PersonCounters) -> RosterResult<()> {
        self.store.with_transaction(|tx| {
            tx.set_tiers(person_id, counters)?;
            tx.append_event(
                self.clock.today(),
                "counter",
                &RosterEvent::TierOverridden {
                    person_id,
                    absence_tier: counters.absence_tier,
                    late_tier: counters.late_tier,
                },
            )?;
            Ok(())
        })
    }

    /// Zero every counter, typically at term boundaries.
    pub fn reset_all_tiers(&self) -> RosterResult<usize> {
        let count = self.store.reset_all_tiers()?;
        log::info!("reset tiers for {count} people");
        Ok(count)
    }

    // ── Roster management ──────────────────────────────────────

    pub fn import_people(&self, rows: &[PersonImport]) -> RosterResult<usize> {
        let count = self
            .store
            .with_transaction(|tx| roster::import_people(tx, rows))?;
        self.store.append_event(
            self.clock.today(),
            "roster",
            &RosterEvent::PeopleImported { count },
        )?;
        Ok(count)
    }

    pub fn load_roster(&self, document: &[PlanDocument]) -> RosterResult<usize> {
        let plans = self
            .store
            .with_transaction(|tx| roster::load_roster(tx, document))?;
        self.store.append_event(
            self.clock.today(),
            "roster",
            &RosterEvent::RosterLoaded { plans },
        )?;
        Ok(plans)
    }

    pub fn export_roster(&self) -> RosterResult<Vec<PlanDocument>> {
        roster::export_roster(&self.store)
    }

    /// Today's duty plan with its assignments in display order.
    pub fn plan_for_today(&self) -> RosterResult<(PlanRecord, Vec<AssignmentRecord>)> {
        let day = RosterClock::day_name(self.clock.today());
        let plan = self
            .store
            .plan_for_day(&day)?
            .ok_or(RosterError::PlanNotFound { day })?;
        let assignments = self.store.plan_assignments(plan.id)?;
        Ok((plan, assignments))
    }

    // ── Internals ──────────────────────────────────────────────

    /// Apply one counter transition inside an open transaction, logging
    /// a tier_changed event per axis that moved.
    fn transition_person(
        &self,
        tx: &RosterStore,
        person_id: PersonId,
        date: NaiveDate,
        previous: Option<AttendanceStatus>,
        new: Option<AttendanceStatus>,
    ) -> RosterResult<()> {
        let person = tx.person(person_id)?;
        let before = person.counters;
        let mut after = before;
        apply_transition(&mut after, previous, new);
        if after == before {
            return Ok(());
        }
        tx.set_tiers(person_id, after)?;
        if after.absence_tier != before.absence_tier {
            tx.append_event(
                date,
                "counter",
                &RosterEvent::tier_changed(
                    person_id,
                    EscalationAxis::Absence,
                    before.absence_tier,
                    after.absence_tier,
                ),
            )?;
        }
        if after.late_tier != before.late_tier {
            tx.append_event(
                date,
                "counter",
                &RosterEvent::tier_changed(
                    person_id,
                    EscalationAxis::Late,
                    before.late_tier,
                    after.late_tier,
                ),
            )?;
        }
        Ok(())
    }

    /// Send one templated notification to a person, honoring the per-day
    /// dedup log. Transport failure is recorded, never returned as Err.
    fn notify_person(
        &self,
        email: &str,
        template: NotificationTemplate,
        date: NaiveDate,
        variables: BTreeMap<String, String>,
    ) -> RosterResult<SendOutcome> {
        let exempt = self
            .config
            .notifier
            .duplicate_exempt
            .iter()
            .any(|fragment| email.contains(fragment.as_str()));
        if !exempt && self.store.notification_logged(email, date)? {
            let reason = "already notified today".to_string();
            self.store.append_event(
                date,
                "notifier",
                &RosterEvent::NotificationSkipped {
                    email: email.to_string(),
                    reason: reason.clone(),
                    date,
                },
            )?;
            return Ok(SendOutcome::Skipped { reason });
        }

        let notification = Notification {
            template,
            recipient: email.to_string(),
            cc: self.config.notifier.admin_cc.clone(),
            variables,
        };
        match self.notifier.send(&notification) {
            SendOutcome::Sent => {
                self.store.log_notification(email, date, template.as_str())?;
                self.store.append_event(
                    date,
                    "notifier",
                    &RosterEvent::NotificationSent {
                        email: email.to_string(),
                        template: template.as_str().to_string(),
                        date,
                    },
                )?;
                Ok(SendOutcome::Sent)
            }
            SendOutcome::Skipped { reason } => {
                self.store.append_event(
                    date,
                    "notifier",
                    &RosterEvent::NotificationSkipped {
                        email: email.to_string(),
                        reason: reason.clone(),
                        date,
                    },
                )?;
                Ok(SendOutcome::Skipped { reason })
            }
            SendOutcome::Failed { message } => {
                log::error!("notification to {email} failed: {message}");
                self.store.append_event(
                    date,
                    "notifier",
                    &RosterEvent::NotificationFailed {
                        email: email.to_string(),
                        message: message.clone(),
                        date,
                    },
                )?;
                Ok(SendOutcome::Failed { message })
            }
        }
    }
}
