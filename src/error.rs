use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced by the storage engine.
///
/// Write-path failures carry the file they concern so a caller can tell a
/// state-file problem from a log or archive problem and report it that way.
/// [`Error::AlreadyRunning`] is the only condition meant to terminate the
/// whole process; everything else aborts a single action.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Reading or writing the state file failed.
    #[error("state file {}: {source}", path.display())]
    State {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Reading or writing the active log partition failed.
    #[error("active log {}: {source}", path.display())]
    ActiveLog {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Reading or writing the archive partition failed.
    #[error("archive log {}: {source}", path.display())]
    ArchiveLog {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Log rotation failed part-way; both partitions are left as they were.
    #[error("log rotation failed: {0}")]
    Rotation(#[source] Box<Error>),

    /// Creating or locking the lock file failed for an I/O reason other
    /// than contention.
    #[error("lock file {}: {source}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Another live process already holds the instance lock.
    #[error("another instance already holds the lock at {}", path.display())]
    AlreadyRunning { path: PathBuf },
}

impl Error {
    /// True when this is the fatal single-instance contention case.
    pub fn is_already_running(&self) -> bool {
        matches!(self, Error::AlreadyRunning { .. })
    }

    pub(crate) fn rotation(inner: Error) -> Error {
        Error::Rotation(Box::new(inner))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
