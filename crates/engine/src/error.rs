use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Result type used by the engine crate.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors produced while loading or validating engine inputs.
///
/// The synchronization core itself never fails: store actions and playable
/// handles degrade to no-ops. Only the loading surfaces return these.
#[derive(Debug)]
pub enum EngineError {
    InvalidDuration {
        duration: f64,
    },
    InvalidTemporalTarget {
        item_id: String,
        start: f64,
        end: f64,
    },
    InvalidKeyframeSpan {
        item_id: String,
        from: usize,
        to: usize,
    },
    DuplicateItemId {
        item_id: String,
    },
    UnsortedKeyframes {
        index: usize,
    },
    PlaybackRejected {
        reason: String,
    },
    DescriptionIo {
        context: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    DescriptionSerialization {
        path: Option<PathBuf>,
        source: serde_json::Error,
    },
    ConfigSerialization {
        source: serde_json::Error,
    },
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDuration { duration } => {
                write!(f, "timeline duration must be finite and non-negative: {duration}")
            }
            Self::InvalidTemporalTarget {
                item_id,
                start,
                end,
            } => write!(f, "invalid temporal target on item {item_id}: {start}..{end}"),
            Self::InvalidKeyframeSpan { item_id, from, to } => {
                write!(f, "invalid keyframe span on item {item_id}: {from}..{to}")
            }
            Self::DuplicateItemId { item_id } => write!(f, "duplicate item id: {item_id}"),
            Self::UnsortedKeyframes { index } => {
                write!(f, "keyframe {index} is earlier than its predecessor")
            }
            Self::PlaybackRejected { reason } => write!(f, "playback rejected: {reason}"),
            Self::DescriptionIo {
                context,
                path,
                source,
            } => write!(f, "{context}: {} ({source})", path.display()),
            Self::DescriptionSerialization { path, source } => match path {
                Some(path) => write!(
                    f,
                    "timeline description deserialization failed at {} ({source})",
                    path.display()
                ),
                None => write!(f, "timeline description deserialization failed ({source})"),
            },
            Self::ConfigSerialization { source } => {
                write!(f, "engine config deserialization failed ({source})")
            }
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::DescriptionIo { source, .. } => Some(source),
            Self::DescriptionSerialization { source, .. } => Some(source),
            Self::ConfigSerialization { source } => Some(source),
            _ => None,
        }
    }
}
