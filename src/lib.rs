//! Event-sourced storage engine for a single net-calorie counter.
//!
//! Every accepted action (add, subtract, reset) is recorded as an immutable
//! JSON-line event carrying its delta, the resulting running total, and an
//! ISO-8601 UTC timestamp. The current value lives in a small state file
//! derived from that history. Events rotate out of a 7-day active window
//! into a rolling archive and expire past a ~90-day retention cap.
//!
//! Durability rules:
//! - every write (state, append, clear, rotation) goes through an atomic
//!   temp-file + fsync + rename, so on-disk content is always fully-old or
//!   fully-new;
//! - a crash artifact (unterminated or garbled line) is skipped on read,
//!   never fatal;
//! - an advisory exclusive file lock enforces one instance per machine and
//!   evaporates with the owning process, so a stale lock can't wedge the
//!   next launch.
//!
//! ```no_run
//! use kcalog::Tracker;
//!
//! let tracker = Tracker::open("/var/lib/kcalog")?;
//! tracker.add(50)?;
//! tracker.subtract(10)?;
//! assert_eq!(tracker.value(), 40);
//! # Ok::<(), kcalog::Error>(())
//! ```

mod atomic;
mod error;
mod event;
mod lock;
mod log;
mod rotate;
mod state;
mod summary;
mod tracker;

pub use atomic::{tmp_sibling, write_atomic};
pub use error::{Error, Result};
pub use event::{Event, EventKind};
pub use lock::InstanceLock;
pub use log::{EventIter, EventLog};
pub use rotate::{RotationPolicy, rotate};
pub use state::{CounterState, StateStore};
pub use summary::{DayNet, WeekSummary, week_summary};
pub use tracker::{
    DEFAULT_ADD_AMOUNT, DEFAULT_SUBTRACT_AMOUNT, LockMode, Tracker, TrackerBuilder, Underflow,
};
