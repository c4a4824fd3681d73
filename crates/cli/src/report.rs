use std::fmt::Write as _;

use timeline_engine::Event;
use timeline_engine::resolve::Resolution;
use timeline_engine::timeline::TimelineDescription;

pub fn items_table(description: &TimelineDescription) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<20} {:<20} {:<6} {:>9} {:>9}",
        "ID", "ANNOTATION", "TYPE", "START", "END"
    );
    for item in &description.items {
        let (start, end) = match item.span(&description.keyframes) {
            Some(span) => (format!("{:.3}", span.start), format_end(span.end)),
            None => ("-".to_owned(), "-".to_owned()),
        };
        let _ = writeln!(
            out,
            "{:<20} {:<20} {:<6} {:>9} {:>9}",
            item.id,
            item.annotation_id,
            format!("{:?}", item.kind),
            start,
            end
        );
    }
    out
}

pub fn resolution_summary(resolution: &Resolution) -> String {
    let mut out = String::new();
    let visible: Vec<&str> = resolution.visible.iter().map(String::as_str).collect();
    let _ = writeln!(out, "  visible: [{}]", visible.join(", "));
    let _ = writeln!(
        out,
        "  prime: {}",
        resolution.prime.as_deref().unwrap_or("none")
    );
    let _ = writeln!(out, "  next keyframe: {}", resolution.next_keyframe_index);
    let _ = writeln!(out, "  video visible: {}", resolution.has_visible_video);
    out
}

pub fn print_events(time: f64, events: &[Event]) {
    for event in events {
        if let Some(line) = describe(event) {
            println!("[{time:>9.3}s] {line}");
        }
    }
}

fn describe(event: &Event) -> Option<String> {
    let line = match event {
        // Emitted every tick while playing.
        Event::TimeChanged { .. } => return None,
        Event::VisibilityChanged { visible } => {
            let ids: Vec<&str> = visible.iter().map(String::as_str).collect();
            format!("visible -> [{}]", ids.join(", "))
        }
        Event::PrimeChanged { prime } => {
            format!("prime -> {}", prime.as_deref().unwrap_or("none"))
        }
        Event::KeyframeCursorChanged { next_index } => format!("next keyframe -> {next_index}"),
        Event::VideoPresenceChanged(visible) => format!("video visible -> {visible}"),
        Event::PlaybackIntentChanged { playing } => {
            let state = if *playing { "playing" } else { "paused" };
            state.to_owned()
        }
        Event::ClockStateChanged { running } => {
            format!("clock {}", if *running { "started" } else { "stopped" })
        }
    };
    Some(line)
}

fn format_end(end: f64) -> String {
    if end.is_finite() {
        format!("{end:.3}")
    } else {
        "end".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use timeline_engine::Event;
    use timeline_engine::resolve::resolve;
    use timeline_engine::timeline::TimelineDescription;

    use super::{describe, items_table, resolution_summary};

    #[test]
    fn table_lists_spans_and_open_ended_items() {
        let description = TimelineDescription::from_json_str(
            r#"{"duration": 5, "items": [
                {"id": "a", "annotationId": "x", "type": "Image"},
                {"id": "b", "annotationId": "y", "type": "Video",
                 "target": {"temporal": {"start": 1, "end": 2}}}
            ]}"#,
        )
        .expect("valid description");

        let table = items_table(&description);
        assert!(table.contains("end"));
        assert!(table.contains("1.000"));

        let summary = resolution_summary(&resolve(&description, 1.5));
        assert!(summary.contains("visible: [x, y]"));
        assert!(summary.contains("prime: b"));
    }

    #[test]
    fn time_changes_are_not_printed() {
        assert_eq!(describe(&Event::TimeChanged { time: 1.0 }), None);
        assert_eq!(
            describe(&Event::VisibilityChanged {
                visible: BTreeSet::from(["a".to_owned()])
            })
            .as_deref(),
            Some("visible -> [a]")
        );
    }
}
