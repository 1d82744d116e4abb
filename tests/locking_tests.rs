use kcalog::{Error, InstanceLock, LockMode, Tracker};
use tempfile::tempdir;

#[test]
fn test_second_acquire_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("app.lock");

    let _lock = InstanceLock::acquire(&path).unwrap();

    let result = InstanceLock::acquire(&path);
    assert!(matches!(result, Err(Error::AlreadyRunning { .. })));
}

#[test]
fn test_already_running_error_names_the_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("app.lock");
    let _lock = InstanceLock::acquire(&path).unwrap();

    let err = InstanceLock::acquire(&path).err().unwrap();
    assert!(err.is_already_running());
    assert!(
        err.to_string().contains("app.lock"),
        "error should name the lock file: {err}"
    );
}

#[test]
fn test_lock_released_on_drop() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("app.lock");

    {
        let _lock = InstanceLock::acquire(&path).unwrap();
    }

    // A crashed or exited process leaves only the file behind, never a
    // lasting claim.
    let _lock = InstanceLock::acquire(&path).unwrap();
}

#[test]
fn test_second_tracker_fails() {
    let dir = tempdir().unwrap();

    let _tracker = Tracker::open(dir.path()).unwrap();

    let result = Tracker::open(dir.path());
    assert!(matches!(result, Err(Error::AlreadyRunning { .. })));
}

#[test]
fn test_tracker_reopens_after_drop() {
    let dir = tempdir().unwrap();

    {
        let tracker = Tracker::open(dir.path()).unwrap();
        tracker.add(50).unwrap();
    }

    let tracker = Tracker::open(dir.path()).unwrap();
    assert_eq!(tracker.value(), 50);
}

#[test]
fn test_lock_mode_none_allows_multiple() {
    let dir = tempdir().unwrap();

    let _a = Tracker::builder(dir.path())
        .lock_mode(LockMode::None)
        .open()
        .unwrap();
    let _b = Tracker::builder(dir.path())
        .lock_mode(LockMode::None)
        .open()
        .unwrap();
}

#[test]
fn test_lock_file_records_pid() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("app.lock");
    let _lock = InstanceLock::acquire(&path).unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.trim(), std::process::id().to_string());
}
