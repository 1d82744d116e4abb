//! Persistence of the current counter value and session metadata.

use crate::atomic::write_atomic;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// The single process-wide counter value plus session metadata.
///
/// `current_value` never goes below zero — it is clamped on load and by the
/// subtract path. The step amounts are what one increment/decrement action
/// applies by default; `session_start` marks when the current counting
/// session began (restarted on reset).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CounterState {
    pub current_value: i64,
    pub add_amount: i64,
    pub subtract_amount: i64,
    pub session_start: DateTime<Utc>,
}

/// On-disk shape with everything beyond `current_value` optional, so a
/// minimal `{"current_value": N}` file from an older build still loads.
#[derive(Deserialize)]
struct RawState {
    #[serde(default)]
    current_value: i64,
    #[serde(default)]
    add_amount: Option<i64>,
    #[serde(default)]
    subtract_amount: Option<i64>,
    #[serde(default)]
    session_start: Option<DateTime<Utc>>,
}

/// Reads and writes the state file.
///
/// Loading never fabricates events; seeding the baseline `init` event on
/// first launch is the caller's job, keeping state mutation and event
/// logging independently observable steps.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        StateStore { path: path.into() }
    }

    /// Path of the state file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load persisted state, falling back to defaults.
    ///
    /// Returns the state and a "needs persist" flag. The flag is set when
    /// the file was absent or unparsable (first launch or self-heal) and
    /// when a missing `session_start` was repaired to `now` — in both cases
    /// the caller should save so the repaired state reaches disk.
    ///
    /// Negative values in the file are clamped to zero rather than rejected.
    ///
    /// # Errors
    ///
    /// Only a real I/O failure (permissions, hardware) is an error; a
    /// missing or corrupt file is handled by defaulting.
    pub fn load(
        &self,
        default_add: i64,
        default_subtract: i64,
        now: DateTime<Utc>,
    ) -> Result<(CounterState, bool)> {
        let defaults = CounterState {
            current_value: 0,
            add_amount: default_add.max(0),
            subtract_amount: default_subtract.max(0),
            session_start: now,
        };

        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok((defaults, true));
            }
            Err(e) => {
                return Err(Error::State {
                    path: self.path.clone(),
                    source: e,
                });
            }
        };

        let raw: RawState = match serde_json::from_str(&contents) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!(
                    "unparsable state file {}, starting fresh: {e}",
                    self.path.display()
                );
                return Ok((defaults, true));
            }
        };

        let mut needs_persist = false;
        let session_start = match raw.session_start {
            Some(ts) => ts,
            None => {
                needs_persist = true;
                now
            }
        };

        Ok((
            CounterState {
                current_value: raw.current_value.max(0),
                add_amount: raw.add_amount.unwrap_or(default_add).max(0),
                subtract_amount: raw.subtract_amount.unwrap_or(default_subtract).max(0),
                session_start,
            },
            needs_persist,
        ))
    }

    /// Persist `state` atomically.
    ///
    /// # Errors
    ///
    /// Returns [`Error::State`] and leaves the previous file intact if the
    /// write fails.
    pub fn save(&self, state: &CounterState) -> Result<()> {
        let state_err = |source: io::Error| Error::State {
            path: self.path.clone(),
            source,
        };
        let json = serde_json::to_string(state)
            .map_err(|e| state_err(io::Error::new(io::ErrorKind::InvalidData, e)))?;
        write_atomic(&self.path, json.as_bytes()).map_err(state_err)
    }
}
