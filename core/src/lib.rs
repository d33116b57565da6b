//! Duty-roster attendance engine.
//!
//! Tracks who actually showed up for their duty assignments, escalates
//! repeat absence and lateness through warning and pay-deduction tiers,
//! and notifies the people involved. SQLite-backed, single-writer, with
//! an append-only audit event log.

pub mod clock;
pub mod config;
pub mod counter;
pub mod engine;
pub mod error;
pub mod escalation;
pub mod event;
pub mod notify;
pub mod roster;
pub mod store;
pub mod sync;
pub mod types;
