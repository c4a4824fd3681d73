//! Wire contract of the embedded-player remote control.
//!
//! Outbound messages are JSON objects `{"event": "command", "func", "args"}`
//! and `{"event": "listening", "id"}`. Inbound state changes arrive as
//! `{"event": "onStateChange", "info": n}` either as JSON text or already
//! parsed.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use url::Url;

const EMBED_BASE_URL: &str = "https://www.youtube.com/";
const EMBED_PARAMS: [(&str, &str); 8] = [
    ("enablejsapi", "1"),
    ("controls", "0"),
    ("disablekb", "1"),
    ("modestbranding", "1"),
    ("rel", "0"),
    ("iv_load_policy", "3"),
    ("fs", "0"),
    ("playsinline", "1"),
];

/// Identity of one embedded browsing context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(pub u64);

/// Commands understood by the embedded player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerCommand {
    PlayVideo,
    PauseVideo,
    SeekTo { seconds: f64, allow_seek_ahead: bool },
    Mute,
    UnMute,
    SetVolume(f64),
}

impl PlayerCommand {
    pub fn func(&self) -> &'static str {
        match self {
            Self::PlayVideo => "playVideo",
            Self::PauseVideo => "pauseVideo",
            Self::SeekTo { .. } => "seekTo",
            Self::Mute => "mute",
            Self::UnMute => "unMute",
            Self::SetVolume(_) => "setVolume",
        }
    }

    pub fn args(&self) -> Vec<Value> {
        match *self {
            Self::SeekTo {
                seconds,
                allow_seek_ahead,
            } => vec![json!(seconds), json!(allow_seek_ahead)],
            Self::SetVolume(volume) => vec![json!(volume)],
            _ => Vec::new(),
        }
    }

    pub fn to_message(&self) -> OutboundMessage {
        OutboundMessage::Command {
            func: self.func().to_owned(),
            args: self.args(),
        }
    }
}

/// Message posted to the embedded context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum OutboundMessage {
    Command { func: String, args: Vec<Value> },
    Listening { id: String },
}

impl OutboundMessage {
    /// Encodes the message as JSON text.
    ///
    /// # Example
    /// ```
    /// use timeline_engine::protocol::PlayerCommand;
    ///
    /// let encoded = PlayerCommand::PlayVideo.to_message().encode().expect("encodable");
    /// assert_eq!(encoded, r#"{"event":"command","func":"playVideo","args":[]}"#);
    /// ```
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Json)
    }
}

/// Playback state reported by the embedded player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Ended,
    Playing,
    Paused,
}

impl PlayerState {
    /// Maps the numeric `info` code. Unknown codes yield `None`.
    pub fn from_info(info: &Value) -> Option<Self> {
        let code = info.as_f64()?;
        if code == 0.0 {
            Some(Self::Ended)
        } else if code == 1.0 {
            Some(Self::Playing)
        } else if code == 2.0 {
            Some(Self::Paused)
        } else {
            None
        }
    }
}

/// Payload of an inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageData {
    Text(String),
    Json(Value),
}

/// Message received on the shared messaging channel.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub source: ContextId,
    pub origin: String,
    pub data: MessageData,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    event: Option<String>,
    #[serde(default)]
    info: Value,
}

/// Failure to encode or decode a protocol payload.
#[derive(Debug)]
pub enum ProtocolError {
    Json(serde_json::Error),
    Url(url::ParseError),
}

impl Display for ProtocolError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(err) => write!(f, "protocol payload is not valid json: {err}"),
            Self::Url(err) => write!(f, "invalid player url: {err}"),
        }
    }
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            Self::Url(err) => Some(err),
        }
    }
}

/// Extracts a player state change from an inbound payload.
///
/// Returns `Ok(None)` for well-formed messages that are not state changes.
pub fn parse_state_change(data: &MessageData) -> Result<Option<PlayerState>, ProtocolError> {
    let envelope: Envelope = match data {
        MessageData::Text(raw) => serde_json::from_str(raw).map_err(ProtocolError::Json)?,
        MessageData::Json(value) => {
            Envelope::deserialize(value).map_err(ProtocolError::Json)?
        }
    };
    if envelope.event.as_deref() != Some("onStateChange") {
        return Ok(None);
    }
    Ok(PlayerState::from_info(&envelope.info))
}

/// Allow-list of origin host families.
///
/// A host belongs to a family when it equals the family or is one of its
/// subdomains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginPolicy {
    hosts: Vec<String>,
}

impl OriginPolicy {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hosts: hosts
                .into_iter()
                .map(|host| host.into().to_ascii_lowercase())
                .collect(),
        }
    }

    /// Returns true when `origin` (`scheme://host[:port]`) is allow-listed.
    ///
    /// # Example
    /// ```
    /// use timeline_engine::protocol::OriginPolicy;
    ///
    /// let policy = OriginPolicy::new(["youtube.com"]);
    /// assert!(policy.allows("https://www.youtube.com"));
    /// assert!(!policy.allows("https://youtube.com.evil.test"));
    /// ```
    pub fn allows(&self, origin: &str) -> bool {
        let Ok(url) = Url::parse(origin) else {
            return false;
        };
        let Some(host) = url.host_str() else {
            return false;
        };
        self.hosts.iter().any(|family| {
            host == family
                || host
                    .strip_suffix(family.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}

/// Extracts a video id from a `youtu.be` or `youtube.com` URL.
///
/// # Example
/// ```
/// use timeline_engine::protocol::extract_youtube_id;
///
/// assert_eq!(extract_youtube_id("https://youtu.be/abc123").as_deref(), Some("abc123"));
/// assert_eq!(
///     extract_youtube_id("https://www.youtube.com/watch?v=xyz&t=4").as_deref(),
///     Some("xyz")
/// );
/// assert_eq!(extract_youtube_id("https://example.com/v/1"), None);
/// ```
pub fn extract_youtube_id(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    let host = url.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);

    let id = if host == "youtu.be" {
        url.path_segments()?.next().map(str::to_owned)
    } else if host == "youtube.com" || host.ends_with(".youtube.com") {
        let mut segments = url.path_segments()?;
        if segments.next() == Some("embed") {
            segments.next().map(str::to_owned)
        } else {
            url.query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned())
        }
    } else {
        None
    };

    id.filter(|id| !id.is_empty())
}

/// Builds the embed URL of a video with the remote-control API enabled.
///
/// `host_origin` is appended form-encoded as the `origin` parameter.
pub fn embed_url(video_id: &str, host_origin: Option<&str>) -> Result<String, ProtocolError> {
    let mut url = Url::parse(EMBED_BASE_URL).map_err(ProtocolError::Url)?;
    url.set_path(&format!("/embed/{video_id}"));
    {
        let mut query = url.query_pairs_mut();
        query.extend_pairs(EMBED_PARAMS);
        if let Some(origin) = host_origin {
            query.append_pair("origin", origin);
        }
    }
    Ok(url.into())
}

/// Handshake id for an embedded player: the annotation id when known.
pub fn handshake_id(annotation_id: Option<&str>, video_id: &str) -> String {
    match annotation_id {
        Some(id) => id.to_owned(),
        None => format!("yt-{video_id}"),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        MessageData, OriginPolicy, OutboundMessage, PlayerCommand, PlayerState, embed_url,
        extract_youtube_id, handshake_id, parse_state_change,
    };

    #[test]
    fn commands_encode_to_wire_shape() {
        let seek = PlayerCommand::SeekTo {
            seconds: 12.5,
            allow_seek_ahead: true,
        }
        .to_message()
        .encode()
        .expect("encodable");
        assert_eq!(
            seek,
            r#"{"event":"command","func":"seekTo","args":[12.5,true]}"#
        );

        let listening = OutboundMessage::Listening {
            id: "anno-1".to_owned(),
        }
        .encode()
        .expect("encodable");
        assert_eq!(listening, r#"{"event":"listening","id":"anno-1"}"#);

        assert_eq!(PlayerCommand::UnMute.func(), "unMute");
        assert_eq!(PlayerCommand::SetVolume(40.0).args(), vec![json!(40.0)]);
    }

    #[test]
    fn parses_text_and_pre_parsed_state_changes() {
        let text = MessageData::Text(r#"{"event":"onStateChange","info":1}"#.to_owned());
        assert_eq!(
            parse_state_change(&text).expect("valid"),
            Some(PlayerState::Playing)
        );

        let value = MessageData::Json(json!({"event": "onStateChange", "info": 0}));
        assert_eq!(
            parse_state_change(&value).expect("valid"),
            Some(PlayerState::Ended)
        );

        let buffering = MessageData::Json(json!({"event": "onStateChange", "info": 3}));
        assert_eq!(parse_state_change(&buffering).expect("valid"), None);

        let other = MessageData::Json(json!({"event": "infoDelivery", "info": {}}));
        assert_eq!(parse_state_change(&other).expect("valid"), None);
    }

    #[test]
    fn malformed_payload_is_an_error() {
        let broken = MessageData::Text("{not json".to_owned());
        assert!(parse_state_change(&broken).is_err());
    }

    #[test]
    fn origin_policy_matches_host_families_only() {
        let policy = OriginPolicy::new(["youtube.com", "youtube-nocookie.com"]);

        assert!(policy.allows("https://www.youtube.com"));
        assert!(policy.allows("https://youtube.com:443"));
        assert!(policy.allows("https://www.youtube-nocookie.com"));
        assert!(!policy.allows("https://notyoutube.com"));
        assert!(!policy.allows("https://youtube.com.example.org"));
        assert!(!policy.allows("youtube.com"));
        assert!(!policy.allows(""));
    }

    #[test]
    fn extracts_ids_from_embed_urls() {
        assert_eq!(
            extract_youtube_id("https://www.youtube.com/embed/abc?start=3").as_deref(),
            Some("abc")
        );
        assert_eq!(extract_youtube_id("https://youtu.be/"), None);
        assert_eq!(extract_youtube_id("not a url"), None);
        assert_eq!(
            extract_youtube_id("https://m.youtube.com/watch?feature=share&v=ab%2Dcd").as_deref(),
            Some("ab-cd")
        );
        assert_eq!(
            extract_youtube_id("https://WWW.YouTube.com/watch?v=Q1").as_deref(),
            Some("Q1")
        );
    }

    #[test]
    fn embed_url_appends_encoded_origin() {
        let url = embed_url("abc", Some("https://viewer.example:8080")).expect("valid url");
        assert!(url.starts_with("https://www.youtube.com/embed/abc?enablejsapi=1&controls=0"));
        assert!(url.ends_with("&playsinline=1&origin=https%3A%2F%2Fviewer.example%3A8080"));
        assert!(!embed_url("abc", None).expect("valid url").contains("origin="));

        let odd = embed_url("a?b#c", None).expect("valid url");
        assert!(odd.starts_with("https://www.youtube.com/embed/a%3Fb%23c?enablejsapi=1"));
    }

    #[test]
    fn handshake_id_prefers_annotation() {
        assert_eq!(handshake_id(Some("anno"), "abc"), "anno");
        assert_eq!(handshake_id(None, "abc"), "yt-abc");
    }
}
