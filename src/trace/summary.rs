//! Deterministic trace summaries.
//!
//! A pure fold over the buffered events: each event's `type` picks a fixed
//! verb template, the expansions join into one text. No timestamps, no
//! external state, so replaying the same ordered sequence always yields
//! byte-identical output.

use crate::core::OpEvent;

fn verb(event_type: &str) -> Option<&'static str> {
    match event_type {
        "exec" | "run" => Some("ran"),
        "deploy" => Some("deployed"),
        "build" => Some("built"),
        "scan" => Some("scanned"),
        "migrate" => Some("migrated"),
        "restart" => Some("restarted"),
        "rollback" => Some("rolled back"),
        "config" => Some("configured"),
        "check" => Some("checked"),
        _ => None,
    }
}

fn line(event: &OpEvent) -> String {
    match verb(&event.event_type) {
        Some(verb) => format!(
            "{verb} {}: {} ({}ms)",
            event.target, event.result, event.duration
        ),
        None => format!(
            "performed {} on {}: {} ({}ms)",
            event.event_type, event.target, event.result, event.duration
        ),
    }
}

/// Render the summary for an ordered event sequence.
pub fn render(events: &[OpEvent]) -> String {
    if events.is_empty() {
        return "no events recorded".to_string();
    }
    let body = events.iter().map(line).collect::<Vec<_>>().join("\n");
    format!("{} event(s):\n{body}", events.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::WallClock;

    fn event(seq: u64, event_type: &str, target: &str) -> OpEvent {
        OpEvent {
            seq,
            ts: WallClock(seq * 1000),
            event_type: event_type.into(),
            target: target.into(),
            result: "ok".into(),
            duration: 42,
            detail: None,
        }
    }

    #[test]
    fn summary_ignores_timestamps() {
        let mut a = vec![event(0, "deploy", "api"), event(1, "check", "health")];
        let b = a.clone();
        a[0].ts = WallClock(999_999);
        assert_eq!(render(&a), render(&b));
    }

    #[test]
    fn known_types_use_their_verb() {
        let text = render(&[event(0, "deploy", "api")]);
        assert!(text.contains("deployed api: ok (42ms)"));
    }

    #[test]
    fn unknown_types_fall_back_to_generic_template() {
        let text = render(&[event(0, "fumigate", "basement")]);
        assert!(text.contains("performed fumigate on basement"));
    }

    #[test]
    fn empty_recording_has_a_fixed_summary() {
        assert_eq!(render(&[]), "no events recorded");
    }
}
