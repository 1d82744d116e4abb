use crate::atomic::write_atomic;
use crate::error::{Error, Result};
use crate::event::{Event, EventKind};
use chrono::{DateTime, Utc};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

/// The append-only event history, split into two JSONL partitions.
///
/// The *active* partition holds the sliding recent window; the *archive*
/// holds aged-out events up to the retention cap (see
/// [`rotate`](crate::rotate::rotate)). Every write goes through the atomic
/// file writer: an append is read-existing + new line + whole-file rename,
/// because plain OS-level append is not crash-safe on every filesystem.
///
/// `EventLog` holds no handles open between calls; the single-instance lock
/// plus the tracker's mutex guarantee no interleaved writers.
#[derive(Debug)]
pub struct EventLog {
    active_path: PathBuf,
    archive_path: PathBuf,
}

impl EventLog {
    pub fn new(active_path: impl Into<PathBuf>, archive_path: impl Into<PathBuf>) -> Self {
        EventLog {
            active_path: active_path.into(),
            archive_path: archive_path.into(),
        }
    }

    /// Path of the active partition file.
    pub fn active_path(&self) -> &Path {
        &self.active_path
    }

    /// Path of the archive partition file.
    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    /// Append one event to the active partition.
    ///
    /// The event is serialized as a single JSON line and the whole partition
    /// is rewritten atomically. An unterminated trailing line left by an
    /// earlier crash is newline-terminated first so it can never merge with
    /// the new record (the damaged line is then skipped on read).
    ///
    /// # Errors
    ///
    /// [`Error::ActiveLog`] if the read or write fails; the partition on
    /// disk is unchanged and the caller must treat the logical action as
    /// not committed.
    pub fn append(&self, event: &Event) -> Result<()> {
        let mut contents = match fs::read_to_string(&self.active_path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(self.active_err(e)),
        };
        if !contents.is_empty() && !contents.ends_with('\n') {
            contents.push('\n');
        }
        let line = serde_json::to_string(event)
            .map_err(|e| self.active_err(io::Error::new(io::ErrorKind::InvalidData, e)))?;
        contents.push_str(&line);
        contents.push('\n');

        write_atomic(&self.active_path, contents.as_bytes())
            .map_err(|e| self.active_err(e))
    }

    /// Read the active partition, oldest first.
    ///
    /// The iterator is lazy over a buffered reader and restartable —
    /// calling again yields the same events absent intervening writes.
    /// Blank and malformed lines are skipped with a warning, and an
    /// unterminated trailing line (crash artifact) is dropped, so one bad
    /// record never hides the rest of the history.
    ///
    /// # Errors
    ///
    /// [`Error::ActiveLog`] if the file cannot be opened (a missing file is
    /// an empty iterator, not an error).
    pub fn read_active(&self) -> Result<EventIter> {
        EventIter::open(&self.active_path, Partition::Active)
    }

    /// Read the archive partition, oldest first. Same contract as
    /// [`read_active`](Self::read_active).
    pub fn read_archive(&self) -> Result<EventIter> {
        EventIter::open(&self.archive_path, Partition::Archive)
    }

    /// Read the full history: archive first, then active.
    ///
    /// Rotation preserves order, so this yields events oldest first across
    /// both partitions.
    pub fn read_full(&self) -> Result<impl Iterator<Item = Result<Event>> + use<>> {
        Ok(self.read_archive()?.chain(self.read_active()?))
    }

    /// Truncate the active partition to empty, atomically.
    ///
    /// # Errors
    ///
    /// [`Error::ActiveLog`]; on failure the partition is left unchanged.
    pub fn clear_active(&self) -> Result<()> {
        write_atomic(&self.active_path, b"").map_err(|e| self.active_err(e))
    }

    /// Truncate the archive partition to empty, atomically. Never touches
    /// the active partition.
    ///
    /// # Errors
    ///
    /// [`Error::ArchiveLog`]; on failure the partition is left unchanged.
    pub fn clear_archive(&self) -> Result<()> {
        write_atomic(&self.archive_path, b"").map_err(|e| self.archive_err(e))
    }

    /// True when the active partition holds at least one readable event.
    pub fn has_events(&self) -> Result<bool> {
        Ok(self.read_active()?.any(|r| r.is_ok()))
    }

    /// Seed the baseline `init` event if the active partition has none.
    ///
    /// Stamped with the session start rather than "now" so the log's first
    /// entry matches the session it describes. Idempotent.
    pub fn seed_init_event(&self, session_start: DateTime<Utc>, total: i64) -> Result<()> {
        if self.has_events()? {
            return Ok(());
        }
        self.append(&Event::at(EventKind::Init, 0, total, session_start))
    }

    /// Atomically replace the active partition with exactly `events`.
    pub(crate) fn rewrite_active(&self, events: &[Event]) -> Result<()> {
        let payload = render_lines(events).map_err(|e| self.active_err(e))?;
        write_atomic(&self.active_path, payload.as_bytes()).map_err(|e| self.active_err(e))
    }

    /// Atomically replace the archive partition with exactly `events`.
    pub(crate) fn rewrite_archive(&self, events: &[Event]) -> Result<()> {
        let payload = render_lines(events).map_err(|e| self.archive_err(e))?;
        write_atomic(&self.archive_path, payload.as_bytes()).map_err(|e| self.archive_err(e))
    }

    fn active_err(&self, source: io::Error) -> Error {
        Error::ActiveLog {
            path: self.active_path.clone(),
            source,
        }
    }

    fn archive_err(&self, source: io::Error) -> Error {
        Error::ArchiveLog {
            path: self.archive_path.clone(),
            source,
        }
    }
}

fn render_lines(events: &[Event]) -> io::Result<String> {
    let mut out = String::new();
    for event in events {
        let line = serde_json::to_string(event)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}

#[derive(Debug, Clone, Copy)]
enum Partition {
    Active,
    Archive,
}

/// Lazy, ordered reader over one log partition.
///
/// Yields events oldest first. Skips blank lines, skips malformed lines
/// with a `warn!`, and stops before an unterminated trailing line so a
/// crash mid-write never surfaces a half-record.
#[derive(Debug)]
pub struct EventIter {
    lines: Option<io::Lines<BufReader<File>>>,
    pos: u64,
    file_len: u64,
    path: PathBuf,
    partition: Partition,
}

impl EventIter {
    fn open(path: &Path, partition: Partition) -> Result<Self> {
        let map_err = |source: io::Error| match partition {
            Partition::Active => Error::ActiveLog {
                path: path.to_path_buf(),
                source,
            },
            Partition::Archive => Error::ArchiveLog {
                path: path.to_path_buf(),
                source,
            },
        };

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(EventIter {
                    lines: None,
                    pos: 0,
                    file_len: 0,
                    path: path.to_path_buf(),
                    partition,
                });
            }
            Err(e) => return Err(map_err(e)),
        };
        let file_len = file.metadata().map_err(map_err)?.len();

        Ok(EventIter {
            lines: Some(BufReader::new(file).lines()),
            pos: 0,
            file_len,
            path: path.to_path_buf(),
            partition,
        })
    }

    fn io_err(&self, source: io::Error) -> Error {
        match self.partition {
            Partition::Active => Error::ActiveLog {
                path: self.path.clone(),
                source,
            },
            Partition::Archive => Error::ArchiveLog {
                path: self.path.clone(),
                source,
            },
        }
    }
}

impl Iterator for EventIter {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.as_mut()?.next()? {
                Ok(line) => line,
                Err(e) => {
                    self.lines = None;
                    return Some(Err(self.io_err(e)));
                }
            };

            let line_bytes = line.len() as u64;

            // A line whose content reaches EOF has no trailing newline:
            // partial write from a crash. Skip it.
            if self.pos + line_bytes >= self.file_len {
                return None;
            }
            self.pos += line_bytes + 1;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match serde_json::from_str::<Event>(trimmed) {
                Ok(event) => return Some(Ok(event)),
                Err(e) => {
                    log::warn!(
                        "skipping malformed record in {}: {e}",
                        self.path.display()
                    );
                    continue;
                }
            }
        }
    }
}
