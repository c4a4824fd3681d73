//! Visibility and keyframe resolution.
//!
//! Everything here is a pure function of `(description, time)`; the store
//! caches the result but recomputing is always safe.

use std::collections::BTreeSet;

use crate::timeline::{AnnotationId, ItemId, ItemType, Keyframe, TimelineDescription};

/// Active state derived from one `(description, time)` snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    /// Annotation ids that are currently visible. Absence means hidden.
    pub visible: BTreeSet<AnnotationId>,
    /// Tie-broken primary active item.
    pub prime: Option<ItemId>,
    pub next_keyframe_index: usize,
    pub has_visible_video: bool,
}

/// Resolves visibility, the prime item and the keyframe cursor at `time`.
///
/// When several items are active the prime is the one with the latest start
/// offset; equal starts keep the first item in description order.
///
/// # Example
/// ```
/// use timeline_engine::TimelineDescription;
/// use timeline_engine::resolve::resolve;
///
/// let description = TimelineDescription::from_json_str(
///     r#"{
///         "duration": 10,
///         "items": [
///             {"id": "a", "annotationId": "x", "type": "Image",
///              "target": {"temporal": {"start": 2, "end": 8}}},
///             {"id": "b", "annotationId": "y", "type": "Image",
///              "target": {"temporal": {"start": 3, "end": 9}}}
///         ]
///     }"#,
/// )
/// .expect("valid description");
///
/// let resolution = resolve(&description, 5.0);
/// assert_eq!(resolution.prime.as_deref(), Some("b"));
/// assert_eq!(resolution.visible.len(), 2);
/// ```
pub fn resolve(description: &TimelineDescription, time: f64) -> Resolution {
    let mut visible = BTreeSet::new();
    let mut prime: Option<(f64, &ItemId)> = None;
    let mut has_visible_video = false;

    for item in &description.items {
        let Some(span) = item.span(&description.keyframes) else {
            continue;
        };
        if !span.contains(time) {
            continue;
        }

        visible.insert(item.annotation_id.clone());
        if item.kind == ItemType::Video {
            has_visible_video = true;
        }
        match prime {
            Some((best_start, _)) if span.start <= best_start => {}
            _ => prime = Some((span.start, &item.id)),
        }
    }

    // Highlights without a backing item are always on.
    for highlight in &description.highlights {
        let id = &highlight.annotation.id;
        if !description.items.iter().any(|item| &item.annotation_id == id) {
            visible.insert(id.clone());
        }
    }

    Resolution {
        visible,
        prime: prime.map(|(_, id)| id.clone()),
        next_keyframe_index: next_keyframe_index(&description.keyframes, time),
        has_visible_video,
    }
}

/// Index of the first keyframe whose timestamp is `>= time`.
///
/// A keyframe exactly at `time` counts as next. Returns `keyframes.len()`
/// when every keyframe lies in the past.
pub fn next_keyframe_index(keyframes: &[Keyframe], time: f64) -> usize {
    keyframes
        .iter()
        .position(|keyframe| keyframe.time >= time)
        .unwrap_or(keyframes.len())
}

#[cfg(test)]
mod tests {
    use super::{next_keyframe_index, resolve};
    use crate::timeline::{
        Highlight, HighlightAnnotation, ItemType, Keyframe, Target, TemporalTarget,
        TimelineDescription, TimelineItem, UntimedActivation,
    };

    #[test]
    fn item_is_active_on_half_open_window() {
        let description = description(vec![timed("a", "x", ItemType::Image, 2.0, 4.0)]);

        assert!(!resolve(&description, 1.999).visible.contains("x"));
        assert!(resolve(&description, 2.0).visible.contains("x"));
        assert!(resolve(&description, 3.999).visible.contains("x"));
        assert!(!resolve(&description, 4.0).visible.contains("x"));
    }

    #[test]
    fn prime_prefers_latest_start_offset() {
        let description = description(vec![
            timed("early", "x", ItemType::Image, 2.0, 9.0),
            timed("late", "y", ItemType::Text, 3.0, 9.0),
        ]);

        let resolution = resolve(&description, 5.0);
        assert_eq!(resolution.prime.as_deref(), Some("late"));
    }

    #[test]
    fn prime_keeps_input_order_on_equal_start() {
        let description = description(vec![
            timed("first", "x", ItemType::Image, 3.0, 9.0),
            timed("second", "y", ItemType::Image, 3.0, 7.0),
        ]);

        assert_eq!(resolve(&description, 5.0).prime.as_deref(), Some("first"));
    }

    #[test]
    fn resolution_is_deterministic() {
        let description = description(vec![
            timed("a", "x", ItemType::Video, 0.0, 5.0),
            timed("b", "y", ItemType::Image, 1.0, 6.0),
            untimed("c", "z", UntimedActivation::Always),
        ]);

        for step in 0..=20 {
            let t = f64::from(step) * 0.5;
            assert_eq!(resolve(&description, t), resolve(&description, t));
        }
    }

    #[test]
    fn untimed_items_follow_their_activation_policy() {
        let mut description = description(vec![
            untimed("always", "a", UntimedActivation::Always),
            untimed("bound", "b", UntimedActivation::Keyframes { from: 1, to: 2 }),
        ]);
        description.keyframes = vec![
            Keyframe { time: 0.0 },
            Keyframe { time: 2.0 },
            Keyframe { time: 4.0 },
        ];

        let early = resolve(&description, 1.0);
        assert!(early.visible.contains("a"));
        assert!(!early.visible.contains("b"));

        let middle = resolve(&description, 3.0);
        assert!(middle.visible.contains("b"));
        assert_eq!(middle.prime.as_deref(), Some("bound"));
    }

    #[test]
    fn video_presence_and_highlights_are_derived() {
        let mut description = description(vec![timed("v", "vid", ItemType::Video, 1.0, 2.0)]);
        description.highlights = vec![
            Highlight {
                annotation: HighlightAnnotation {
                    id: "vid".to_owned(),
                },
            },
            Highlight {
                annotation: HighlightAnnotation {
                    id: "free".to_owned(),
                },
            },
        ];

        let before = resolve(&description, 0.5);
        assert!(!before.has_visible_video);
        assert!(!before.visible.contains("vid"));
        assert!(before.visible.contains("free"));

        let during = resolve(&description, 1.5);
        assert!(during.has_visible_video);
        assert!(during.visible.contains("vid"));
    }

    #[test]
    fn next_keyframe_boundary_is_inclusive() {
        let keyframes = [
            Keyframe { time: 0.0 },
            Keyframe { time: 2.0 },
            Keyframe { time: 4.0 },
        ];

        assert_eq!(next_keyframe_index(&keyframes, 0.0), 0);
        assert_eq!(next_keyframe_index(&keyframes, 0.1), 1);
        assert_eq!(next_keyframe_index(&keyframes, 2.0), 1);
        assert_eq!(next_keyframe_index(&keyframes, 4.5), 3);
        assert_eq!(next_keyframe_index(&[], 1.0), 0);
    }

    fn description(items: Vec<TimelineItem>) -> TimelineDescription {
        TimelineDescription {
            duration: 10.0,
            items,
            keyframes: Vec::new(),
            highlights: Vec::new(),
        }
    }

    fn timed(id: &str, annotation: &str, kind: ItemType, start: f64, end: f64) -> TimelineItem {
        TimelineItem {
            id: id.to_owned(),
            annotation_id: annotation.to_owned(),
            kind,
            target: Target {
                temporal: Some(TemporalTarget { start, end }),
                spatial: None,
            },
            untimed: UntimedActivation::Always,
            url: None,
        }
    }

    fn untimed(id: &str, annotation: &str, untimed: UntimedActivation) -> TimelineItem {
        TimelineItem {
            id: id.to_owned(),
            annotation_id: annotation.to_owned(),
            kind: ItemType::Text,
            target: Target::default(),
            untimed,
            url: None,
        }
    }
}
