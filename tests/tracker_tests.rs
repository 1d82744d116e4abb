use kcalog::{Error, EventKind, Tracker, Underflow};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_first_launch_seeds_baseline() {
    let dir = tempdir().unwrap();
    let tracker = Tracker::open(dir.path()).unwrap();

    assert_eq!(tracker.value(), 0);

    let events = tracker.read_active().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::Init);
    assert_eq!(events[0].delta, 0);
    assert_eq!(events[0].total, 0);
    assert_eq!(events[0].timestamp, tracker.session_start());

    let state: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join("state.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(state["current_value"], 0);
}

#[test]
fn test_add_subtract_reset_scenario() {
    let dir = tempdir().unwrap();
    let tracker = Tracker::open(dir.path()).unwrap();

    assert_eq!(tracker.add(50).unwrap(), 50);
    assert_eq!(tracker.subtract(10).unwrap(), 40);

    let events = tracker.read_active().unwrap();
    assert_eq!(events.len(), 3); // init + add + subtract
    assert_eq!(events[1].kind, EventKind::Add);
    assert_eq!((events[1].delta, events[1].total), (50, 50));
    assert_eq!(events[2].kind, EventKind::Subtract);
    assert_eq!((events[2].delta, events[2].total), (-10, 40));

    tracker.reset().unwrap();
    assert_eq!(tracker.value(), 0);

    let events = tracker.read_active().unwrap();
    let last = events.last().unwrap();
    assert_eq!(last.kind, EventKind::Reset);
    assert_eq!((last.delta, last.total), (-40, 0));
}

#[test]
fn test_subtract_clamps_and_logs_actual_delta() {
    let dir = tempdir().unwrap();
    let tracker = Tracker::open(dir.path()).unwrap();
    tracker.add(30).unwrap();

    // Nominal 100, only 30 available: the logged delta is what was applied.
    assert_eq!(tracker.subtract(100).unwrap(), 0);

    let last = tracker.read_active().unwrap().pop().unwrap();
    assert_eq!(last.kind, EventKind::Subtract);
    assert_eq!((last.delta, last.total), (-30, 0));
}

#[test]
fn test_subtract_at_zero_logs_nothing() {
    let dir = tempdir().unwrap();
    let tracker = Tracker::open(dir.path()).unwrap();

    assert_eq!(tracker.subtract(10).unwrap(), 0);

    let events = tracker.read_active().unwrap();
    assert_eq!(events.len(), 1, "only the init event should exist");
}

#[test]
fn test_underflow_reject_policy() {
    let dir = tempdir().unwrap();
    let tracker = Tracker::builder(dir.path())
        .underflow(Underflow::Reject)
        .open()
        .unwrap();
    tracker.add(30).unwrap();

    // Would underflow: rejected wholesale — no event, no change.
    assert_eq!(tracker.subtract(100).unwrap(), 30);
    assert_eq!(tracker.value(), 30);
    assert_eq!(tracker.read_active().unwrap().len(), 2); // init + add

    // An exact-fit subtract is still accepted.
    assert_eq!(tracker.subtract(30).unwrap(), 0);
    assert_eq!(tracker.read_active().unwrap().len(), 3);
}

#[test]
fn test_default_amounts() {
    let dir = tempdir().unwrap();
    let tracker = Tracker::open(dir.path()).unwrap();

    assert_eq!(tracker.amounts(), (50, 10));
    assert_eq!(tracker.add_default().unwrap(), 50);
    assert_eq!(tracker.subtract_default().unwrap(), 40);
}

#[test]
fn test_set_amounts_persists() {
    let dir = tempdir().unwrap();
    {
        let tracker = Tracker::open(dir.path()).unwrap();
        tracker.set_amounts(100, 25).unwrap();
    }

    let tracker = Tracker::open(dir.path()).unwrap();
    assert_eq!(tracker.amounts(), (100, 25));
    assert_eq!(tracker.add_default().unwrap(), 100);
}

#[test]
fn test_value_survives_reopen() {
    let dir = tempdir().unwrap();
    {
        let tracker = Tracker::open(dir.path()).unwrap();
        tracker.add(50).unwrap();
        tracker.add(50).unwrap();
        tracker.subtract(25).unwrap();
    }

    let tracker = Tracker::open(dir.path()).unwrap();
    assert_eq!(tracker.value(), 75);

    // The reopened log matches: last event total == current value.
    let events = tracker.read_active().unwrap();
    assert_eq!(events.last().unwrap().total, 75);
}

#[test]
fn test_clear_archive_leaves_active_untouched() {
    let dir = tempdir().unwrap();
    let tracker = Tracker::open(dir.path()).unwrap();
    tracker.add(50).unwrap();
    fs::write(
        dir.path().join("log_archive.jsonl"),
        "{\"kind\":\"add\",\"delta\":5,\"total\":5,\"timestamp\":\"2026-05-01T00:00:00Z\"}\n",
    )
    .unwrap();

    let active_before = fs::read(dir.path().join("session_log.jsonl")).unwrap();
    tracker.clear_archive().unwrap();

    assert!(tracker.read_archive().unwrap().is_empty());
    assert_eq!(
        fs::read(dir.path().join("session_log.jsonl")).unwrap(),
        active_before
    );
    assert_eq!(tracker.value(), 50);
}

#[test]
fn test_clear_active_keeps_counter_value() {
    let dir = tempdir().unwrap();
    let tracker = Tracker::open(dir.path()).unwrap();
    tracker.add(50).unwrap();

    tracker.clear_active().unwrap();

    assert!(tracker.read_active().unwrap().is_empty());
    assert_eq!(tracker.value(), 50);
}

#[test]
fn test_reopen_after_clear_reseeds_baseline_with_value() {
    let dir = tempdir().unwrap();
    {
        let tracker = Tracker::open(dir.path()).unwrap();
        tracker.add(50).unwrap();
        tracker.clear_active().unwrap();
    }

    let tracker = Tracker::open(dir.path()).unwrap();
    let events = tracker.read_active().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::Init);
    assert_eq!(events[0].total, 50, "baseline reflects the live value");
}

#[test]
fn test_failed_append_leaves_visible_state_unchanged() {
    let dir = tempdir().unwrap();
    let tracker = Tracker::open(dir.path()).unwrap();
    tracker.add(50).unwrap();

    // Occupy the active log's temp path with a directory so the next
    // atomic rewrite fails before the rename.
    fs::create_dir(dir.path().join(".session_log.jsonl.tmp")).unwrap();

    let result = tracker.add(25);
    assert!(matches!(result, Err(Error::ActiveLog { .. })));
    assert_eq!(tracker.value(), 50, "visible value must not move");

    fs::remove_dir(dir.path().join(".session_log.jsonl.tmp")).unwrap();
    let state: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join("state.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(state["current_value"], 50, "persisted value must not move");
}

#[test]
fn test_failed_reset_aborts_whole_action() {
    let dir = tempdir().unwrap();
    let tracker = Tracker::open(dir.path()).unwrap();
    tracker.add(50).unwrap();
    let session_before = tracker.session_start();

    fs::create_dir(dir.path().join(".session_log.jsonl.tmp")).unwrap();

    assert!(tracker.reset().is_err());
    assert_eq!(tracker.value(), 50);
    assert_eq!(tracker.session_start(), session_before);
}

#[test]
fn test_add_saturates_at_i64_max() {
    let dir = tempdir().unwrap();
    let near_max = i64::MAX - 10;
    fs::write(
        dir.path().join("state.json"),
        format!(
            "{{\"current_value\": {near_max}, \"add_amount\": 50, \"subtract_amount\": 10, \
             \"session_start\": \"2026-08-31T00:00:00Z\"}}"
        ),
    )
    .unwrap();

    let tracker = Tracker::open(dir.path()).unwrap();
    assert_eq!(tracker.value(), near_max);

    // No overflow: the value tops out and the logged delta is what was
    // actually applied.
    assert_eq!(tracker.add(100).unwrap(), i64::MAX);

    let last = tracker.read_active().unwrap().pop().unwrap();
    assert_eq!(last.kind, EventKind::Add);
    assert_eq!((last.delta, last.total), (10, i64::MAX));
}

#[test]
fn test_zero_subtract_logs_nothing() {
    let dir = tempdir().unwrap();
    let tracker = Tracker::open(dir.path()).unwrap();
    tracker.add(50).unwrap();
    let before = tracker.read_active().unwrap().len();

    assert_eq!(tracker.subtract(0).unwrap(), 50);
    assert_eq!(tracker.read_active().unwrap().len(), before);
}
