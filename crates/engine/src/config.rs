use std::time::Duration;

use crate::error::{EngineError, Result};
use crate::time::millis;
use serde::{Deserialize, Serialize};

const DEFAULT_TICK_INTERVAL_MS: u64 = 16;
const DEFAULT_HANDSHAKE_GRACE_MS: u64 = 100;
const DEFAULT_ALLOWED_ORIGIN_HOSTS: [&str; 2] = ["youtube.com", "youtube-nocookie.com"];

/// Engine tuning shared by the store and remote handles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Period of the store tick loop.
    pub tick_interval_ms: u64,
    /// Delay before the remote handshake is re-sent.
    pub handshake_grace_ms: u64,
    /// Host families accepted as origins of inbound remote messages.
    pub allowed_origin_hosts: Vec<String>,
    /// Multiplier applied to wall-clock deltas when the clock advances.
    pub playback_rate: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            handshake_grace_ms: DEFAULT_HANDSHAKE_GRACE_MS,
            allowed_origin_hosts: DEFAULT_ALLOWED_ORIGIN_HOSTS
                .iter()
                .map(|host| (*host).to_owned())
                .collect(),
            playback_rate: 1.0,
        }
    }
}

impl EngineConfig {
    /// Parses a config from JSON. Missing fields take their defaults.
    ///
    /// # Example
    /// ```
    /// use timeline_engine::EngineConfig;
    ///
    /// let config = EngineConfig::from_json_str(r#"{"tick_interval_ms": 40}"#).expect("valid");
    /// assert_eq!(config.tick_interval_ms, 40);
    /// assert_eq!(config.handshake_grace_ms, 100);
    /// ```
    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|source| EngineError::ConfigSerialization { source })
    }

    pub fn tick_interval(&self) -> Duration {
        millis(self.tick_interval_ms.max(1))
    }

    pub fn handshake_grace(&self) -> Duration {
        millis(self.handshake_grace_ms)
    }

    /// Playback rate with non-finite or negative values treated as `1.0`.
    pub fn effective_playback_rate(&self) -> f64 {
        if self.playback_rate.is_finite() && self.playback_rate >= 0.0 {
            self.playback_rate
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::EngineConfig;

    #[test]
    fn defaults_allow_youtube_families() {
        let config = EngineConfig::default();
        assert_eq!(
            config.allowed_origin_hosts,
            vec!["youtube.com".to_owned(), "youtube-nocookie.com".to_owned()]
        );
        assert_eq!(config.tick_interval().as_millis(), 16);
    }

    #[test]
    fn invalid_json_is_reported() {
        assert!(EngineConfig::from_json_str("{").is_err());
    }

    #[test]
    fn negative_rate_falls_back_to_realtime() {
        let config = EngineConfig {
            playback_rate: -2.0,
            ..EngineConfig::default()
        };
        assert_eq!(config.effective_playback_rate(), 1.0);
    }
}
