//! Movement of aged events from the active window into the archive, and
//! expiry of archive entries past the retention cap.

use crate::error::{Error, Result};
use crate::event::Event;
use crate::log::EventLog;
use chrono::{DateTime, Duration, Utc};

/// How long events stay in each partition.
///
/// Defaults match the deployed behavior: a 7-day active window and a 90-day
/// archive retention cap. Both boundaries are exclusive on the aging side —
/// an event exactly at the cutoff instant has not yet aged out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Events younger than this stay in the active partition.
    pub active_window: Duration,
    /// Archive entries older than this are discarded.
    pub archive_retention: Duration,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        RotationPolicy {
            active_window: Duration::days(7),
            archive_retention: Duration::days(90),
        }
    }
}

impl RotationPolicy {
    /// Default policy with a custom archive retention, in days.
    pub fn with_retention_days(days: i64) -> Self {
        RotationPolicy {
            archive_retention: Duration::days(days),
            ..RotationPolicy::default()
        }
    }
}

/// Rotate the log relative to `now`. Idempotent; safe to call on every
/// append/read cycle.
///
/// 1. Active events strictly older than the active window move to the end
///    of the archive, preserving order and timestamps; the active partition
///    is then rewritten with only the kept events.
/// 2. Archive entries strictly older than the retention cap are discarded
///    and the archive rewritten.
///
/// Each partition rewrite is atomic, and the archive is written *before*
/// the active partition is truncated: a failure at any point leaves every
/// event still present somewhere, so a failed rotation only delays aging —
/// it never loses or duplicates events. Malformed lines are compacted away
/// when their partition is rewritten.
///
/// # Errors
///
/// [`Error::Rotation`] wrapping the failing partition's error. If the
/// archive write fails, the active partition is untouched.
pub fn rotate(log: &EventLog, policy: &RotationPolicy, now: DateTime<Utc>) -> Result<()> {
    let active_cutoff = now - policy.active_window;

    let mut keep = Vec::new();
    let mut aged = Vec::new();
    for event in log.read_active().map_err(Error::rotation)? {
        let event = event.map_err(Error::rotation)?;
        if event.timestamp >= active_cutoff {
            keep.push(event);
        } else {
            aged.push(event);
        }
    }

    let mut archived: Vec<Event> = if aged.is_empty() {
        Vec::new()
    } else {
        let mut archived = collect_archive(log)?;
        archived.extend(aged.iter().cloned());
        log.rewrite_archive(&archived).map_err(Error::rotation)?;
        log.rewrite_active(&keep).map_err(Error::rotation)?;
        log::debug!("rotated {} event(s) into the archive", aged.len());
        archived
    };

    if archived.is_empty() {
        archived = collect_archive(log)?;
    }

    let retention_cutoff = now - policy.archive_retention;
    let retained: Vec<Event> = archived
        .iter()
        .filter(|e| e.timestamp >= retention_cutoff)
        .cloned()
        .collect();
    if retained.len() != archived.len() {
        log.rewrite_archive(&retained).map_err(Error::rotation)?;
        log::debug!(
            "discarded {} expired archive event(s)",
            archived.len() - retained.len()
        );
    }

    Ok(())
}

fn collect_archive(log: &EventLog) -> Result<Vec<Event>> {
    log.read_archive()
        .map_err(Error::rotation)?
        .map(|r| r.map_err(Error::rotation))
        .collect()
}
