//! Recording session state machine: idle, recording, stopped.
//!
//! While recording, a worker thread owns the event buffer exclusively and
//! drains the subscription channel, stamping each arrival with the next
//! sequence number. Nothing is reordered or deduplicated. Cancellation is
//! cooperative: the worker checks the stop flag between deliveries, so the
//! buffer is never torn mid-write. If persisting fails on stop, the drained
//! buffer is retained and `stop` may be retried.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam::channel::{self, RecvTimeoutError, Sender};

use super::error::TraceError;
use super::summary;
use crate::core::{
    EventInput, MessageDraft, MessageSource, OpEvent, Trace, TraceId, UserId, WallClock,
};
use crate::ledger::LedgerService;
use crate::resolve::parse_refs;

/// How long the worker sleeps between stop-flag checks when idle.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

struct Meta {
    trace_id: TraceId,
    name: String,
    classification: String,
    user: UserId,
    code_ref: String,
    started_at: WallClock,
}

enum Session {
    /// Worker running, buffer owned by the worker thread.
    Live {
        meta: Meta,
        stop: Arc<AtomicBool>,
        worker: JoinHandle<Vec<OpEvent>>,
    },
    /// Buffer drained but not yet persisted; `stop` retries from here.
    Drained { trace: Trace },
}

/// Handed to the caller on start: the id plus the channel that feeds events
/// into the recording window.
#[derive(Debug)]
pub struct RecordingHandle {
    pub trace_id: TraceId,
    pub feed: Sender<EventInput>,
}

/// Result of a clean stop. The draft seeds a chat message but is never
/// posted here; publishing is an explicit caller action so a human can edit
/// the summary first.
pub struct StoppedTrace {
    pub trace: Trace,
    pub draft: MessageDraft,
}

#[derive(Default)]
pub struct TraceRecorder {
    active: Option<Session>,
}

impl TraceRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.active, Some(Session::Live { .. }))
    }

    /// Open a recording window. Rejects synchronously while another
    /// recording is active; sessions never nest.
    pub fn start(
        &mut self,
        ledger: &LedgerService,
        name: &str,
        classification: &str,
        user: UserId,
    ) -> Result<RecordingHandle, TraceError> {
        if self.active.is_some() {
            return Err(TraceError::AlreadyRecording);
        }
        let code_ref = ledger.current_code_ref()?;
        let trace_id = TraceId::generate();
        let (feed, rx) = channel::unbounded::<EventInput>();
        let stop = Arc::new(AtomicBool::new(false));

        let worker = {
            let stop = Arc::clone(&stop);
            std::thread::spawn(move || {
                let mut events: Vec<OpEvent> = Vec::new();
                loop {
                    if stop.load(Ordering::Acquire) {
                        // One final drain of what already arrived; nothing
                        // sent after this point is buffered.
                        while let Ok(input) = rx.try_recv() {
                            let seq = events.len() as u64;
                            events.push(input.stamp(seq, WallClock::now()));
                        }
                        break;
                    }
                    match rx.recv_timeout(POLL_INTERVAL) {
                        Ok(input) => {
                            let seq = events.len() as u64;
                            events.push(input.stamp(seq, WallClock::now()));
                        }
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                events
            })
        };

        self.active = Some(Session::Live {
            meta: Meta {
                trace_id: trace_id.clone(),
                name: name.to_string(),
                classification: classification.to_string(),
                user,
                code_ref,
                started_at: WallClock::now(),
            },
            stop,
            worker,
        });
        tracing::info!(trace = %trace_id, name, "recording started");
        Ok(RecordingHandle { trace_id, feed })
    }

    /// Close the window, persist the trace, and hand back the summary draft.
    ///
    /// On a persistence failure the drained trace is retained and the call
    /// may be retried; the recording is never left torn.
    pub fn stop(&mut self, ledger: &LedgerService) -> Result<StoppedTrace, TraceError> {
        let trace = match self.active.take() {
            None => return Err(TraceError::NotRecording),
            Some(Session::Drained { trace }) => trace,
            Some(Session::Live { meta, stop, worker }) => {
                stop.store(true, Ordering::Release);
                let events = worker.join().map_err(|_| TraceError::WorkerLost)?;
                let audit_refs = harvest_audit_refs(&events);
                let auto_summary = summary::render(&events);
                Trace {
                    trace_id: meta.trace_id,
                    name: meta.name,
                    classification: meta.classification,
                    started_at: meta.started_at,
                    ended_at: WallClock::now(),
                    user: meta.user,
                    code_ref: meta.code_ref,
                    events,
                    audit_refs,
                    auto_summary,
                }
            }
        };

        if let Err(err) = ledger.put_trace(&trace) {
            self.active = Some(Session::Drained { trace });
            return Err(err.into());
        }
        tracing::info!(trace = %trace.trace_id, events = trace.events.len(), "trace persisted");

        let mut refs = vec![format!("@trace:{}", trace.trace_id)];
        refs.extend(trace.audit_refs.iter().cloned());
        let draft = MessageDraft {
            user: trace.user.clone(),
            thread_id: None,
            text: trace.auto_summary.clone(),
            refs,
            flags: Default::default(),
            trace_id: Some(trace.trace_id.clone()),
            source: MessageSource::Trace,
        };
        Ok(StoppedTrace { trace, draft })
    }

    /// Tear the session down without persisting anything. Idle is a no-op.
    pub fn cancel(&mut self) {
        match self.active.take() {
            Some(Session::Live { stop, worker, meta }) => {
                stop.store(true, Ordering::Release);
                let _ = worker.join();
                tracing::info!(trace = %meta.trace_id, "recording cancelled");
            }
            Some(Session::Drained { trace }) => {
                tracing::info!(trace = %trace.trace_id, "drained recording discarded");
            }
            None => {}
        }
    }
}

/// Cross-links into the external audit log, harvested from event text.
/// First-occurrence order, duplicates dropped.
fn harvest_audit_refs(events: &[OpEvent]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for event in events {
        let mut text = event.target.clone();
        if let Some(detail) = &event.detail {
            text.push(' ');
            text.push_str(detail);
        }
        for reference in parse_refs(&text) {
            if reference.kind == crate::core::RefKind::Audit {
                let rendered = reference.to_string();
                if seen.insert(rendered.clone()) {
                    out.push(rendered);
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(seq: u64, target: &str, detail: Option<&str>) -> OpEvent {
        OpEvent {
            seq,
            ts: WallClock(seq),
            event_type: "exec".into(),
            target: target.into(),
            result: "ok".into(),
            duration: 1,
            detail: detail.map(|s| s.to_string()),
        }
    }

    #[test]
    fn audit_refs_are_harvested_and_deduped() {
        let events = vec![
            event(0, "api", Some("logged as @audit:evt-1")),
            event(1, "@audit:evt-1", None),
            event(2, "db", Some("see @audit:evt-2 and @run:0000000000001-aaaa")),
        ];
        assert_eq!(
            harvest_audit_refs(&events),
            vec!["@audit:evt-1".to_string(), "@audit:evt-2".to_string()]
        );
    }

    #[test]
    fn no_audit_refs_yields_empty() {
        assert!(harvest_audit_refs(&[event(0, "api", None)]).is_empty());
    }
}
