mod common;

use opslog::chat::MessageScope;
use opslog::{EventInput, MessageSource, OpsLedger, UserId};

fn user(name: &str) -> UserId {
    UserId::new(name).unwrap()
}

fn feed_events(handle: &opslog::trace::RecordingHandle, specs: &[(&str, &str)]) {
    for (event_type, target) in specs {
        handle
            .feed
            .send(EventInput::new(*event_type, *target, "ok", 10))
            .unwrap();
    }
}

#[test]
fn recording_buffers_events_in_arrival_order() {
    let dir = common::init_repo();
    let mut ops = OpsLedger::open(dir.path()).unwrap();

    let handle = ops.start_trace("deploy window", "routine", user("alice")).unwrap();
    assert!(ops.is_recording());
    feed_events(&handle, &[("deploy", "api"), ("check", "health"), ("exec", "smoke")]);

    let stopped = ops.stop_trace().unwrap();
    assert!(!ops.is_recording());

    let trace = &stopped.trace;
    assert_eq!(trace.name, "deploy window");
    assert_eq!(trace.classification, "routine");
    assert_eq!(trace.events.len(), 3);
    let seqs: Vec<u64> = trace.events.iter().map(|e| e.seq).collect();
    assert_eq!(seqs, vec![0, 1, 2]);
    let targets: Vec<&str> = trace.events.iter().map(|e| e.target.as_str()).collect();
    assert_eq!(targets, vec!["api", "health", "smoke"]);

    // Persisted and readable back.
    let fetched = ops.get_trace(&trace.trace_id).unwrap();
    assert_eq!(&fetched, trace);
}

#[test]
fn summary_is_deterministic_across_recordings() {
    let dir = common::init_repo();
    let mut ops = OpsLedger::open(dir.path()).unwrap();
    let specs = [("deploy", "api"), ("check", "health")];

    let handle = ops.start_trace("first", "routine", user("alice")).unwrap();
    feed_events(&handle, &specs);
    let first = ops.stop_trace().unwrap();

    let handle = ops.start_trace("second", "routine", user("alice")).unwrap();
    feed_events(&handle, &specs);
    let second = ops.stop_trace().unwrap();

    assert_eq!(first.trace.auto_summary, second.trace.auto_summary);
    assert!(first.trace.auto_summary.contains("deployed api"));
}

#[test]
fn second_start_is_rejected_not_nested() {
    let dir = common::init_repo();
    let mut ops = OpsLedger::open(dir.path()).unwrap();

    let _handle = ops.start_trace("one", "routine", user("alice")).unwrap();
    let err = ops
        .start_trace("two", "routine", user("alice"))
        .unwrap_err();
    assert!(err.to_string().contains("already active"));
    // The original recording is still the active one.
    assert!(ops.is_recording());
}

#[test]
fn stop_without_start_is_rejected() {
    let dir = common::init_repo();
    let mut ops = OpsLedger::open(dir.path()).unwrap();
    assert!(ops.stop_trace().is_err());
}

#[test]
fn draft_is_never_auto_posted() {
    let dir = common::init_repo();
    let mut ops = OpsLedger::open(dir.path()).unwrap();

    let handle = ops.start_trace("window", "routine", user("alice")).unwrap();
    feed_events(&handle, &[("deploy", "api")]);
    let stopped = ops.stop_trace().unwrap();

    // Nothing in chat until the caller explicitly posts the draft.
    assert!(ops
        .list_messages(&MessageScope::Timeline, None)
        .unwrap()
        .messages
        .is_empty());

    let posted = ops.send(stopped.draft).unwrap();
    assert_eq!(posted.source, MessageSource::Trace);
    assert_eq!(posted.trace_id.as_ref(), Some(&stopped.trace.trace_id));
    assert_eq!(posted.text, stopped.trace.auto_summary);
    assert!(posted
        .refs
        .contains(&format!("@trace:{}", stopped.trace.trace_id)));
}

#[test]
fn audit_refs_are_harvested_into_the_trace() {
    let dir = common::init_repo();
    let mut ops = OpsLedger::open(dir.path()).unwrap();

    let handle = ops.start_trace("window", "routine", user("alice")).unwrap();
    handle
        .feed
        .send(EventInput::new("exec", "api", "ok", 5).with_detail("logged as @audit:evt-77"))
        .unwrap();
    let stopped = ops.stop_trace().unwrap();

    assert_eq!(stopped.trace.audit_refs, vec!["@audit:evt-77".to_string()]);
    assert!(stopped.draft.refs.contains(&"@audit:evt-77".to_string()));
}

#[test]
fn cancel_discards_the_window() {
    let dir = common::init_repo();
    let mut ops = OpsLedger::open(dir.path()).unwrap();

    let handle = ops.start_trace("doomed", "routine", user("alice")).unwrap();
    feed_events(&handle, &[("deploy", "api")]);
    ops.cancel_trace();
    assert!(!ops.is_recording());

    // Cancelled recordings persist nothing, and a new window may open.
    assert!(ops.stop_trace().is_err());
    let handle = ops.start_trace("next", "routine", user("alice")).unwrap();
    feed_events(&handle, &[("check", "health")]);
    let stopped = ops.stop_trace().unwrap();
    assert_eq!(stopped.trace.events.len(), 1);
}

#[test]
fn events_after_stop_are_not_buffered() {
    let dir = common::init_repo();
    let mut ops = OpsLedger::open(dir.path()).unwrap();

    let handle = ops.start_trace("window", "routine", user("alice")).unwrap();
    feed_events(&handle, &[("deploy", "api")]);
    let stopped = ops.stop_trace().unwrap();

    // The subscription is closed; late sends fail and change nothing.
    assert!(handle.feed.send(EventInput::new("exec", "late", "ok", 1)).is_err());
    let fetched = ops.get_trace(&stopped.trace.trace_id).unwrap();
    assert_eq!(fetched.events.len(), 1);
}
