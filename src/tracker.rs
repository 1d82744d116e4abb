//! Top-level facade tying state, log, rotation, and locking together.

use crate::error::Result;
use crate::event::{Event, EventKind};
use crate::lock::InstanceLock;
use crate::log::EventLog;
use crate::rotate::{RotationPolicy, rotate};
use crate::state::{CounterState, StateStore};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// File names inside the base directory.
const STATE_FILE: &str = "state.json";
const ACTIVE_LOG_FILE: &str = "session_log.jsonl";
const ARCHIVE_LOG_FILE: &str = "log_archive.jsonl";
const LOCK_FILE: &str = "app.lock";

/// Step sizes applied by the default add/subtract actions.
pub const DEFAULT_ADD_AMOUNT: i64 = 50;
pub const DEFAULT_SUBTRACT_AMOUNT: i64 = 10;

/// Whether the tracker claims the single-instance lock on open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockMode {
    /// Acquire an exclusive advisory lock; a second open fails with
    /// [`Error::AlreadyRunning`](crate::Error::AlreadyRunning).
    #[default]
    Exclusive,
    /// No locking. For read-only consumers and tests.
    None,
}

/// What a subtract does when it would push the counter below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Underflow {
    /// Clamp at zero and log the delta actually applied; a subtract that
    /// changes nothing logs no event.
    #[default]
    Clamp,
    /// Refuse the whole action: no event, no state change.
    Reject,
}

/// Configures and opens a [`Tracker`].
///
/// ```no_run
/// use kcalog::{Tracker, Underflow};
///
/// let tracker = Tracker::builder("/var/lib/kcalog")
///     .archive_retention_days(30)
///     .underflow(Underflow::Reject)
///     .open()?;
/// # Ok::<(), kcalog::Error>(())
/// ```
#[derive(Debug)]
pub struct TrackerBuilder {
    dir: PathBuf,
    policy: RotationPolicy,
    underflow: Underflow,
    lock_mode: LockMode,
    default_add: i64,
    default_subtract: i64,
}

impl TrackerBuilder {
    fn new(dir: &Path) -> Self {
        TrackerBuilder {
            dir: dir.to_path_buf(),
            policy: RotationPolicy::default(),
            underflow: Underflow::default(),
            lock_mode: LockMode::default(),
            default_add: DEFAULT_ADD_AMOUNT,
            default_subtract: DEFAULT_SUBTRACT_AMOUNT,
        }
    }

    /// Replace the whole rotation policy.
    pub fn rotation_policy(mut self, policy: RotationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Archive retention in days (default 90).
    pub fn archive_retention_days(mut self, days: i64) -> Self {
        self.policy.archive_retention = chrono::Duration::days(days);
        self
    }

    /// Underflow policy for subtract actions (default [`Underflow::Clamp`]).
    pub fn underflow(mut self, underflow: Underflow) -> Self {
        self.underflow = underflow;
        self
    }

    /// Locking behavior (default [`LockMode::Exclusive`]).
    pub fn lock_mode(mut self, mode: LockMode) -> Self {
        self.lock_mode = mode;
        self
    }

    /// Step sizes used when the state file carries none.
    pub fn default_amounts(mut self, add: i64, subtract: i64) -> Self {
        self.default_add = add;
        self.default_subtract = subtract;
        self
    }

    /// Open the tracker: acquire the lock, load (and repair) state, rotate
    /// opportunistically, and seed the baseline `init` event on a fresh log.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyRunning`](crate::Error::AlreadyRunning) when another
    /// instance holds the lock — the caller should log and exit non-zero.
    /// Otherwise any state or log I/O failure from the open sequence.
    pub fn open(self) -> Result<Tracker> {
        let lock = match self.lock_mode {
            LockMode::Exclusive => Some(InstanceLock::acquire(self.dir.join(LOCK_FILE))?),
            LockMode::None => None,
        };

        let store = StateStore::new(self.dir.join(STATE_FILE));
        let log = EventLog::new(
            self.dir.join(ACTIVE_LOG_FILE),
            self.dir.join(ARCHIVE_LOG_FILE),
        );

        let now = Utc::now();
        let (state, needs_persist) = store.load(self.default_add, self.default_subtract, now)?;
        if needs_persist {
            store.save(&state)?;
        }

        rotate(&log, &self.policy, now)?;
        log.seed_init_event(state.session_start, state.current_value)?;

        Ok(Tracker {
            inner: Mutex::new(Inner {
                state,
                store,
                log,
                policy: self.policy,
                underflow: self.underflow,
                _lock: lock,
            }),
        })
    }
}

#[derive(Debug)]
struct Inner {
    state: CounterState,
    store: StateStore,
    log: EventLog,
    policy: RotationPolicy,
    underflow: Underflow,
    _lock: Option<InstanceLock>,
}

/// The counter engine: one current value, an event per accepted action,
/// durable across crashes, single instance per machine.
///
/// All methods take `&self`; an internal mutex serializes every
/// append–rotate–read sequence so a rotation and an append can never
/// interleave their atomic replaces (the instance lock already rules out a
/// second process). Failed writes leave both the persisted and the visible
/// value at the last successfully persisted state.
#[derive(Debug)]
pub struct Tracker {
    inner: Mutex<Inner>,
}

impl Tracker {
    /// Start configuring a tracker over `dir`.
    pub fn builder(dir: impl AsRef<Path>) -> TrackerBuilder {
        TrackerBuilder::new(dir.as_ref())
    }

    /// Open with all defaults.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        Tracker::builder(dir).open()
    }

    /// Current counter value.
    pub fn value(&self) -> i64 {
        self.lock_inner().state.current_value
    }

    /// When the current counting session began.
    pub fn session_start(&self) -> DateTime<Utc> {
        self.lock_inner().state.session_start
    }

    /// Configured (add, subtract) step sizes.
    pub fn amounts(&self) -> (i64, i64) {
        let inner = self.lock_inner();
        (inner.state.add_amount, inner.state.subtract_amount)
    }

    /// Add `amount` to the counter. Returns the new value.
    ///
    /// The event is appended before the state is saved; if the append
    /// fails, nothing is mutated and the action did not happen. A
    /// [`Error::Rotation`](crate::Error::Rotation) can still come back
    /// after the action committed: the event and value are durable, only
    /// aging was deferred.
    pub fn add(&self, amount: i64) -> Result<i64> {
        let mut inner = self.lock_inner();
        let amount = amount.max(0);
        let before = inner.state.current_value;
        // Saturate at the top end; like a clamped subtract, the logged
        // delta is the amount actually applied.
        let new_value = before.saturating_add(amount);
        let applied = new_value - before;
        inner.apply(Event::new(EventKind::Add, applied, new_value), new_value)?;
        Ok(new_value)
    }

    /// Add the configured step amount.
    pub fn add_default(&self) -> Result<i64> {
        let amount = self.lock_inner().state.add_amount;
        self.add(amount)
    }

    /// Subtract `amount` from the counter. Returns the (possibly unchanged)
    /// new value.
    ///
    /// Behavior below zero follows the configured [`Underflow`] policy.
    /// Under [`Underflow::Clamp`] the logged delta is the amount actually
    /// applied, not the nominal one.
    pub fn subtract(&self, amount: i64) -> Result<i64> {
        let mut inner = self.lock_inner();
        let amount = amount.max(0);
        let before = inner.state.current_value;

        let applied = match inner.underflow {
            Underflow::Clamp => amount.min(before),
            Underflow::Reject => {
                if amount > before {
                    log::debug!("subtract of {amount} rejected at value {before}");
                    return Ok(before);
                }
                amount
            }
        };
        if applied == 0 {
            // Already at zero (or a zero-amount action): nothing to log.
            return Ok(before);
        }

        let new_value = before - applied;
        inner.apply(
            Event::new(EventKind::Subtract, -applied, new_value),
            new_value,
        )?;
        Ok(new_value)
    }

    /// Subtract the configured step amount.
    pub fn subtract_default(&self) -> Result<i64> {
        let amount = self.lock_inner().state.subtract_amount;
        self.subtract(amount)
    }

    /// Reset the counter to zero and start a new session.
    ///
    /// The `reset` event (delta = negated current value) is appended first;
    /// if that fails the session is left untouched so the on-disk history
    /// and the visible value never diverge.
    pub fn reset(&self) -> Result<()> {
        let mut inner = self.lock_inner();
        let before = inner.state.current_value;
        let reset_time = Utc::now();

        inner.apply_with_session(
            Event::at(EventKind::Reset, -before, 0, reset_time),
            0,
            Some(reset_time),
        )
    }

    /// Persist new step sizes.
    pub fn set_amounts(&self, add: i64, subtract: i64) -> Result<()> {
        let mut inner = self.lock_inner();
        inner.state.add_amount = add.max(0);
        inner.state.subtract_amount = subtract.max(0);
        inner.save_state()
    }

    /// All events in the active window, oldest first.
    pub fn read_active(&self) -> Result<Vec<Event>> {
        self.lock_inner().log.read_active()?.collect()
    }

    /// All archived events, oldest first.
    pub fn read_archive(&self) -> Result<Vec<Event>> {
        self.lock_inner().log.read_archive()?.collect()
    }

    /// Truncate the active partition. The counter value and the archive are
    /// untouched.
    pub fn clear_active(&self) -> Result<()> {
        self.lock_inner().log.clear_active()
    }

    /// Truncate the archive partition. The counter value and the active
    /// partition are untouched.
    pub fn clear_archive(&self) -> Result<()> {
        self.lock_inner().log.clear_archive()
    }

    /// Run rotation relative to `now`. Also happens implicitly after every
    /// appended event; this hook exists for idle callbacks and tests.
    pub fn rotate_at(&self, now: DateTime<Utc>) -> Result<()> {
        let inner = self.lock_inner();
        rotate(&inner.log, &inner.policy, now)
    }

    fn lock_inner(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Inner {
    fn apply(&mut self, event: Event, new_value: i64) -> Result<()> {
        self.apply_with_session(event, new_value, None)
    }

    /// Commit one accepted action: append the event, mutate and persist
    /// state, then rotate opportunistically.
    ///
    /// A failed append aborts before any visible mutation. A failed
    /// rotation surfaces as [`Error::Rotation`](crate::Error::Rotation)
    /// *after* the action is committed — the event is durable and aging
    /// simply retries on a later cycle, but the caller gets to report it.
    fn apply_with_session(
        &mut self,
        event: Event,
        new_value: i64,
        new_session_start: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let now = event.timestamp;
        self.log.append(&event)?;
        self.state.current_value = new_value;
        if let Some(start) = new_session_start {
            self.state.session_start = start;
        }
        self.save_state()?;
        rotate(&self.log, &self.policy, now)
    }

    fn save_state(&self) -> Result<()> {
        self.store.save(&self.state)
    }
}
