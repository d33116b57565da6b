//! rollcall: command-line front end for the duty-roster engine.
//!
//! Usage:
//!   rollcall import-people --file people.json
//!   rollcall load-roster --file roster.json
//!   rollcall submit --assignment 12 --status absent [--date 2026-03-04]
//!   rollcall sync --file batch.json
//!   rollcall dispatch [--date 2026-03-04]
//!   rollcall schedule

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use rollcall_core::config::RosterConfig;
use rollcall_core::counter::PersonCounters;
use rollcall_core::engine::RosterEngine;
use rollcall_core::notify::LogNotifier;
use rollcall_core::roster::{PersonImport, PlanDocument};
use rollcall_core::sync::SyncBatch;
use rollcall_core::types::AttendanceStatus;
use std::env;
use std::path::Path;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let command = match args.get(1) {
        Some(c) => c.as_str(),
        None => {
            print_usage();
            return Ok(());
        }
    };

    let config = load_config(&args)?;
    let engine = RosterEngine::new(config, Box::new(LogNotifier))?;

    match command {
        "init" => {
            println!("database ready at {}", engine.config().database_path);
        }
        "import-people" => {
            let path = required_arg(&args, "--file")?;
            let rows: Vec<PersonImport> = read_json(Path::new(&path))?;
            let count = engine.import_people(&rows)?;
            println!("imported {count} people");
        }
        "load-roster" => {
            let path = required_arg(&args, "--file")?;
            let document: Vec<PlanDocument> = read_json(Path::new(&path))?;
            let plans = engine.load_roster(&document)?;
            println!("loaded {plans} duty plans");
        }
        "export-roster" => {
            let document = engine.export_roster()?;
            let text = serde_json::to_string_pretty(&document)?;
            match arg_value(&args, "--out") {
                Some(path) => {
                    std::fs::write(&path, text)
                        .with_context(|| format!("writing {path}"))?;
                    println!("wrote {path}");
                }
                None => println!("{text}"),
            }
        }
        "today" => {
            let (plan, assignments) = engine.plan_for_today()?;
            println!(
                "{} (supervisor: {})  {}",
                plan.day_of_week,
                plan.supervisor,
                engine.today()
            );
            for assignment in assignments {
                let name = match assignment.person_id {
                    Some(id) => engine.store().person(id)?.full_name,
                    None => assignment
                        .placeholder_name
                        .unwrap_or_else(|| "(unassigned)".into()),
                };
                let record = engine.store().attendance_record(assignment.id, engine.today())?;
                let status = record
                    .map(|r| r.status.to_string())
                    .unwrap_or_else(|| "-".into());
                println!("{:>4}  {:<30} {}", assignment.id, name, status);
            }
        }
        "people" => {
            for person in engine.store().list_people()? {
                println!(
                    "{:>4}  {}  <{}>  absence={} late={}",
                    person.id,
                    person.full_name,
                    person.email,
                    person.counters.absence_tier,
                    person.counters.late_tier
                );
            }
        }
        "submit" => {
            let assignment: i64 = parse_required(&args, "--assignment")?;
            let status: AttendanceStatus = required_arg(&args, "--status")?
                .parse()
                .map_err(|e| anyhow!("{e}"))?;
            let date = date_arg(&args, &engine)?;
            let notes = arg_value(&args, "--notes");
            engine.submit_attendance(assignment, date, status, notes.as_deref())?;
            println!("recorded {status} for assignment {assignment} on {date}");
        }
        "delete" => {
            let assignment: i64 = parse_required(&args, "--assignment")?;
            let date = date_arg(&args, &engine)?;
            if engine.delete_attendance(assignment, date)? {
                println!("deleted record for assignment {assignment} on {date}");
            } else {
                println!("no record for assignment {assignment} on {date}");
            }
        }
        "sync" => {
            let path = required_arg(&args, "--file")?;
            let batch: SyncBatch = read_json(Path::new(&path))?;
            let outcome = engine.apply_sync_batch(&batch)?;
            println!(
                "batch {} accepted {} entries (notices: {} sent, {} skipped, {} failed)",
                outcome.batch_id,
                outcome.accepted,
                outcome.notifications.sent,
                outcome.notifications.skipped,
                outcome.notifications.failed
            );
        }
        "dispatch" => {
            let date = date_arg(&args, &engine)?;
            let report = engine.run_dispatch(date)?;
            print_report(&report);
        }
        "set-tiers" => {
            let person: i64 = parse_required(&args, "--person")?;
            let absence: u8 = parse_required(&args, "--absence")?;
            let late: u8 = parse_required(&args, "--late")?;
            engine.override_tiers(
                person,
                PersonCounters {
                    absence_tier: absence,
                    late_tier: late,
                },
            )?;
            println!("person {person}: absence={absence} late={late}");
        }
        "reset-tiers" => {
            let count = engine.reset_all_tiers()?;
            println!("reset tiers for {count} people");
        }
        "schedule" => run_schedule(&engine)?,
        other => {
            print_usage();
            bail!("unknown command: {other}");
        }
    }

    Ok(())
}

/// Poll once a minute and fire the dispatch when the configured local
/// time arrives. The dispatch gate makes a duplicate firing harmless.
fn run_schedule(engine: &RosterEngine) -> Result<()> {
    let (hour, minute) = engine
        .config()
        .schedule
        .dispatch_time_parts()
        .ok_or_else(|| {
            anyhow!(
                "bad dispatch_time '{}' in config",
                engine.config().schedule.dispatch_time
            )
        })?;
    println!(
        "scheduler running; dispatch fires daily at {:02}:{:02} local",
        hour, minute
    );
    loop {
        let now = engine.local_now();
        use chrono::Timelike;
        if now.hour() == hour && now.minute() >= minute {
            let date = engine.today();
            if !engine.store().dispatch_ran(date)? {
                let report = engine.run_dispatch(date)?;
                print_report(&report);
            }
        }
        std::thread::sleep(std::time::Duration::from_secs(60));
    }
}

fn print_report(report: &rollcall_core::escalation::DispatchReport) {
    println!("=== DISPATCH {} ===", report.date);
    println!("  run_id:  {}", report.run_id);
    println!("  counted: {}", report.counted);
    println!("  sent:    {}", report.sent);
    println!("  skipped: {}", report.skipped);
    println!("  failed:  {}", report.failed);
    for (template, count) in &report.sent_by_template {
        println!("    {template}: {count}");
    }
    for skip in &report.skips {
        println!("  skip: {} ({})", skip.name, skip.reason);
    }
    for failure in &report.failures {
        println!("  fail: {failure}");
    }
}

fn load_config(args: &[String]) -> Result<RosterConfig> {
    let mut config = match arg_value(args, "--config") {
        Some(path) => RosterConfig::from_file(Path::new(&path))?,
        None => {
            let default_path = Path::new("rollcall.json");
            if default_path.exists() {
                RosterConfig::from_file(default_path)?
            } else {
                RosterConfig::default()
            }
        }
    };
    if let Some(db) = arg_value(args, "--db") {
        config.database_path = db;
    }
    Ok(config)
}

fn date_arg(args: &[String], engine: &RosterEngine) -> Result<NaiveDate> {
    match arg_value(args, "--date") {
        Some(text) => text
            .parse()
            .with_context(|| format!("bad date '{text}', expected YYYY-MM-DD")),
        None => Ok(engine.today()),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].clone())
}

fn required_arg(args: &[String], flag: &str) -> Result<String> {
    arg_value(args, flag).ok_or_else(|| anyhow!("missing required argument {flag}"))
}

fn parse_required<T: std::str::FromStr>(args: &[String], flag: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    let raw = required_arg(args, flag)?;
    raw.parse()
        .map_err(|e| anyhow!("bad value '{raw}' for {flag}: {e}"))
}

fn print_usage() {
    println!("rollcall — duty-roster attendance tracker");
    println!();
    println!("commands:");
    println!("  init                                  create/upgrade the database");
    println!("  import-people --file people.json      upsert the staff list");
    println!("  load-roster   --file roster.json      replace duty plans");
    println!("  export-roster [--out roster.json]     dump current plans as JSON");
    println!("  today                                 show today's plan and ledger");
    println!("  people                                list people with current tiers");
    println!("  submit --assignment N --status S      record one attendance tuple");
    println!("  delete --assignment N                 remove one attendance tuple");
    println!("  sync --file batch.json                apply an offline batch");
    println!("  dispatch [--date YYYY-MM-DD]          run the end-of-day escalation");
    println!("  set-tiers --person N --absence A --late L");
    println!("  reset-tiers                           zero every counter");
    println!("  schedule                              run the daily dispatch loop");
    println!();
    println!("global flags: --config PATH  --db PATH  --date YYYY-MM-DD");
}
