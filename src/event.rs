use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a logged transition did to the counter.
///
/// Serialized lowercase (`"init"`, `"add"`, `"subtract"`, `"reset"`); the
/// four kinds are the complete event vocabulary of the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Baseline entry seeded on first launch (or after the log was cleared).
    Init,
    /// Counter increased by `delta`.
    Add,
    /// Counter decreased; `delta` is negative and reflects the amount
    /// actually applied after clamping.
    Subtract,
    /// Counter returned to zero; `delta` is the negated previous value.
    Reset,
}

/// One immutable state transition, stored as a single JSON line.
///
/// `total` is the counter value *after* applying `delta`, so in append order
/// each event's `total` equals the running sum of deltas up to and including
/// it (absent log clears). Events are never edited in place — they only move
/// wholesale between the active and archive partitions or get purged past
/// the retention window.
///
/// # Examples
///
/// ```
/// use kcalog::{Event, EventKind};
///
/// let event = Event::new(EventKind::Add, 50, 50);
/// assert_eq!(event.kind, EventKind::Add);
/// assert_eq!(event.total, 50);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// The transition kind.
    pub kind: EventKind,

    /// Signed change applied to the counter.
    pub delta: i64,

    /// Counter value after this event.
    pub total: i64,

    /// When the transition happened, UTC, serialized as ISO-8601.
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// Create an event stamped with the current time.
    pub fn new(kind: EventKind, delta: i64, total: i64) -> Self {
        Event {
            kind,
            delta,
            total,
            timestamp: Utc::now(),
        }
    }

    /// Create an event with an explicit timestamp.
    ///
    /// Used for the first-launch baseline entry (stamped with the session
    /// start) and throughout the tests.
    pub fn at(kind: EventKind, delta: i64, total: i64, timestamp: DateTime<Utc>) -> Self {
        Event {
            kind,
            delta,
            total,
            timestamp,
        }
    }
}
