//! Single-instance enforcement via an advisory exclusive file lock.

use crate::error::{Error, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// An exclusive advisory lock held for the lifetime of this value.
///
/// Liveness comes from the OS: the lock is released when the holding process
/// exits for any reason, so a lock file left behind by a crashed process
/// never blocks a later launch. The holder's PID is written into the file
/// purely as a diagnostic — it plays no part in lock arbitration.
#[derive(Debug)]
pub struct InstanceLock {
    path: PathBuf,
    file: File,
}

impl InstanceLock {
    /// Acquire the lock at `path`, creating the file if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyRunning`] when another live process holds the
    /// lock — the caller is expected to log this and exit with a non-zero
    /// status. Any other failure (permissions, unreachable directory) is
    /// [`Error::Lock`].
    pub fn acquire(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let lock_err = |source: io::Error| Error::Lock {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(lock_err)?;
        }
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(lock_err)?;

        match file.try_lock_exclusive() {
            Ok(()) => {}
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                log::error!("another instance already holds {}", path.display());
                return Err(Error::AlreadyRunning { path });
            }
            Err(e) => return Err(lock_err(e)),
        }

        // Best-effort PID note for humans inspecting the lock file.
        if let Err(e) = file
            .set_len(0)
            .and_then(|_| writeln!(file, "{}", std::process::id()))
        {
            log::warn!("failed to record pid in {}: {e}", path.display());
        }

        log::debug!("instance lock acquired at {}", path.display());
        Ok(InstanceLock { path, file })
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            log::warn!("failed to release lock {}: {e}", self.path.display());
        }
    }
}
