//! Crash-safe whole-file replacement.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Atomically replace the contents of `path` with `bytes`.
///
/// Writes to a dot-prefixed `.tmp` sibling in the same directory, flushes and
/// syncs it, then renames over `path`. A concurrent reader (or a reader after
/// a crash) sees either the previous content or the new content in full,
/// never a partial write. If anything fails before the rename, `path` is
/// untouched and the temp file is removed on a best-effort basis.
///
/// Parent directories are created if missing.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = tmp_sibling(path);

    let result = (|| {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.flush()?;
        file.sync_data()?;
        drop(file);
        fs::rename(&tmp_path, path)
    })();

    if result.is_err() {
        if let Err(e) = fs::remove_file(&tmp_path) {
            if e.kind() != io::ErrorKind::NotFound {
                log::warn!("failed to remove temp file {}: {e}", tmp_path.display());
            }
        }
    }
    result
}

/// Temp path used by [`write_atomic`]: `.{file_name}.tmp` next to the target.
pub fn tmp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}
