use std::collections::HashSet;
use std::path::Path;

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Stable key of one rendered timeline item.
pub type ItemId = String;
/// Identity used for visibility and handle lookup.
pub type AnnotationId = String;

/// Timeline description produced by the manifest layer.
///
/// The engine treats it as read-only input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineDescription {
    pub duration: f64,
    #[serde(default)]
    pub items: Vec<TimelineItem>,
    #[serde(default)]
    pub keyframes: Vec<Keyframe>,
    #[serde(default)]
    pub highlights: Vec<Highlight>,
}

/// One renderable entry of the timeline.
///
/// `annotation_id` differs from `id` because one annotation may back several
/// render variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineItem {
    pub id: ItemId,
    pub annotation_id: AnnotationId,
    #[serde(rename = "type")]
    pub kind: ItemType,
    #[serde(default)]
    pub target: Target,
    /// Activation used when `target.temporal` is absent.
    #[serde(default)]
    pub untimed: UntimedActivation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemType {
    Image,
    Text,
    Video,
    Sound,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Target {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporal: Option<TemporalTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spatial: Option<SpatialTarget>,
}

/// Half-open activation window `[start, end)` in timeline seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemporalTarget {
    pub start: f64,
    pub end: f64,
}

/// Opaque spatial placement forwarded to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpatialTarget {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Activation policy of an item without a temporal target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "camelCase")]
pub enum UntimedActivation {
    /// Active for the whole timeline.
    #[default]
    Always,
    /// Active from keyframe `from` up to keyframe `to` (exclusive). A `to`
    /// past the last keyframe keeps the item active until the end.
    Keyframes { from: usize, to: usize },
}

/// Ordered timestamp boundary of the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub time: f64,
}

/// Highlight overlay bound to an annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    pub annotation: HighlightAnnotation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightAnnotation {
    pub id: AnnotationId,
}

/// Resolved activation window of one item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub start: f64,
    pub end: f64,
}

impl Span {
    pub const ALWAYS: Self = Self {
        start: 0.0,
        end: f64::INFINITY,
    };

    /// Returns true when `t` falls within `[start, end)`.
    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t < self.end
    }
}

/// Cheap structural signature `(duration, items, keyframes)`.
///
/// Two descriptions with the same fingerprint are treated as equivalent even
/// if item content differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    duration_bits: u64,
    pub items: usize,
    pub keyframes: usize,
}

impl Fingerprint {
    pub fn duration(&self) -> f64 {
        f64::from_bits(self.duration_bits)
    }
}

impl TimelineDescription {
    /// Parses and validates a description from JSON text.
    ///
    /// # Example
    /// ```
    /// use timeline_engine::TimelineDescription;
    ///
    /// let description = TimelineDescription::from_json_str(
    ///     r#"{"duration": 10, "items": [], "keyframes": [{"time": 0}]}"#,
    /// )
    /// .expect("valid description");
    /// assert_eq!(description.keyframes.len(), 1);
    /// ```
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let description: Self = serde_json::from_str(raw)
            .map_err(|source| EngineError::DescriptionSerialization { path: None, source })?;
        description.validate()?;
        Ok(description)
    }

    /// Reads, parses and validates a description file.
    pub fn from_json_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| EngineError::DescriptionIo {
            context: "failed to read timeline description",
            path: path.to_path_buf(),
            source,
        })?;
        let description: Self =
            serde_json::from_str(&raw).map_err(|source| EngineError::DescriptionSerialization {
                path: Some(path.to_path_buf()),
                source,
            })?;
        description.validate()?;
        debug!(
            path = ?path,
            items = description.items.len(),
            keyframes = description.keyframes.len(),
            "timeline description loaded"
        );
        Ok(description)
    }

    /// Checks structural invariants the resolver relies on.
    pub fn validate(&self) -> Result<()> {
        if !self.duration.is_finite() || self.duration < 0.0 {
            warn!(duration = self.duration, "description rejected: duration");
            return Err(EngineError::InvalidDuration {
                duration: self.duration,
            });
        }

        let mut seen = HashSet::with_capacity(self.items.len());
        for item in &self.items {
            if !seen.insert(item.id.as_str()) {
                warn!(item_id = %item.id, "description rejected: duplicate item id");
                return Err(EngineError::DuplicateItemId {
                    item_id: item.id.clone(),
                });
            }
            item.validate(self.keyframes.len())?;
        }

        let mut previous = f64::NEG_INFINITY;
        for (index, keyframe) in self.keyframes.iter().enumerate() {
            if !keyframe.time.is_finite() || keyframe.time < previous {
                warn!(index, time = keyframe.time, "description rejected: keyframe order");
                return Err(EngineError::UnsortedKeyframes { index });
            }
            previous = keyframe.time;
        }

        Ok(())
    }

    /// Returns the reconciliation fingerprint of this description.
    pub fn fingerprint(&self) -> Fingerprint {
        // Normalize -0.0 so it fingerprints like 0.0.
        let duration = if self.duration == 0.0 { 0.0 } else { self.duration };
        Fingerprint {
            duration_bits: duration.to_bits(),
            items: self.items.len(),
            keyframes: self.keyframes.len(),
        }
    }

    /// Returns true when any item or highlight references `annotation_id`.
    pub fn references(&self, annotation_id: &str) -> bool {
        self.items
            .iter()
            .any(|item| item.annotation_id == annotation_id)
            || self
                .highlights
                .iter()
                .any(|highlight| highlight.annotation.id == annotation_id)
    }
}

impl TimelineItem {
    /// Resolves the activation window of this item against `keyframes`.
    ///
    /// Returns `None` when the item can never be active.
    pub fn span(&self, keyframes: &[Keyframe]) -> Option<Span> {
        if let Some(temporal) = self.target.temporal {
            return Some(Span {
                start: temporal.start,
                end: temporal.end,
            });
        }

        match self.untimed {
            UntimedActivation::Always => Some(Span::ALWAYS),
            UntimedActivation::Keyframes { from, to } => {
                let start = keyframes.get(from)?.time;
                let end = keyframes.get(to).map_or(f64::INFINITY, |keyframe| keyframe.time);
                Some(Span { start, end })
            }
        }
    }

    fn validate(&self, keyframe_count: usize) -> Result<()> {
        if let Some(TemporalTarget { start, end }) = self.target.temporal {
            if !start.is_finite() || !end.is_finite() || end < start {
                warn!(item_id = %self.id, start, end, "description rejected: temporal target");
                return Err(EngineError::InvalidTemporalTarget {
                    item_id: self.id.clone(),
                    start,
                    end,
                });
            }
            return Ok(());
        }

        if let UntimedActivation::Keyframes { from, to } = self.untimed {
            if from >= keyframe_count || to < from {
                warn!(item_id = %self.id, from, to, "description rejected: keyframe span");
                return Err(EngineError::InvalidKeyframeSpan {
                    item_id: self.id.clone(),
                    from,
                    to,
                });
            }
        }

        Ok(())
    }
}
