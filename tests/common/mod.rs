#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use kcalog::{Event, EventKind, EventLog};
use std::path::Path;

/// Fixed reference instant so window math in tests is deterministic.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 31, 12, 0, 0).unwrap()
}

pub fn event_at(kind: EventKind, delta: i64, total: i64, ts: DateTime<Utc>) -> Event {
    Event::at(kind, delta, total, ts)
}

pub fn add_at(delta: i64, total: i64, ts: DateTime<Utc>) -> Event {
    Event::at(EventKind::Add, delta, total, ts)
}

/// An `add` event `days` before [`t0`].
pub fn add_days_ago(days: i64, delta: i64, total: i64) -> Event {
    add_at(delta, total, t0() - Duration::days(days))
}

/// Standard log over a temp directory's `session_log.jsonl` /
/// `log_archive.jsonl` pair.
pub fn open_log(dir: &Path) -> EventLog {
    EventLog::new(dir.join("session_log.jsonl"), dir.join("log_archive.jsonl"))
}

pub fn collect(iter: kcalog::EventIter) -> Vec<Event> {
    iter.collect::<kcalog::Result<Vec<_>>>().unwrap()
}
