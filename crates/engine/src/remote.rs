use std::time::{Duration, Instant};

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::playable::Playable;
use crate::protocol::{
    ContextId, InboundMessage, OriginPolicy, OutboundMessage, PlayerCommand, PlayerState,
    parse_state_change,
};
use crate::time::{clamp_volume, elapsed_seconds};
use tracing::{debug, trace};

const DEFAULT_VOLUME: f64 = 100.0;

/// Messaging endpoint of one embedded cross-origin player.
///
/// Delivery is best-effort: posting to a context that is gone or not loaded
/// yet is silently lost.
pub trait MessagePort {
    fn post_message(&self, message: &str);

    /// Starts routing inbound messages from `context` to the bound handle.
    fn add_listener(&self, context: ContextId);

    fn remove_listener(&self, context: ContextId);
}

/// Identity the remote handle binds to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteBinding {
    pub context: ContextId,
    pub handshake_id: String,
}

/// Player state change reported back to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteEvent {
    Playing,
    Paused,
    Ended,
}

impl From<PlayerState> for RemoteEvent {
    fn from(value: PlayerState) -> Self {
        match value {
            PlayerState::Playing => Self::Playing,
            PlayerState::Paused => Self::Paused,
            PlayerState::Ended => Self::Ended,
        }
    }
}

#[derive(Debug, Default)]
struct AdvanceLoop {
    scheduled: bool,
    last_frame: Option<Instant>,
}

/// [`Playable`] over an embedded player reachable only through messages.
///
/// The player offers no synchronous reads, so `paused`, `current_time`,
/// `muted` and `volume` are local estimates updated optimistically when a
/// command is issued. While playing, the host drives [`RemoteHandle::poll`]
/// once per frame; each frame advances the position estimate by the measured
/// wall-clock delta.
#[derive(Debug)]
pub struct RemoteHandle<P, C>
where
    P: MessagePort,
    C: Clock,
{
    port: P,
    clock: C,
    binding: RemoteBinding,
    policy: OriginPolicy,
    handshake_grace: Duration,
    handshake_retry_at: Option<Instant>,
    listening: bool,
    paused: bool,
    time: f64,
    muted: bool,
    volume: f64,
    advance: AdvanceLoop,
}

impl<P, C> RemoteHandle<P, C>
where
    P: MessagePort,
    C: Clock,
{
    /// Binds to an embedded context and announces readiness.
    ///
    /// The handshake is sent immediately and once more after the configured
    /// grace delay, since the first one may reach a context that is not
    /// interactive yet.
    pub fn bind(port: P, clock: C, binding: RemoteBinding, config: &EngineConfig) -> Self {
        let now = clock.now();
        let handshake_grace = config.handshake_grace();
        let mut handle = Self {
            port,
            clock,
            binding,
            policy: OriginPolicy::new(config.allowed_origin_hosts.iter().cloned()),
            handshake_grace,
            handshake_retry_at: Some(now + handshake_grace),
            listening: true,
            paused: true,
            time: 0.0,
            muted: false,
            volume: DEFAULT_VOLUME,
            advance: AdvanceLoop::default(),
        };
        handle.port.add_listener(handle.binding.context);
        handle.send_handshake();
        handle
    }

    pub fn binding(&self) -> &RemoteBinding {
        &self.binding
    }

    pub fn is_bound(&self) -> bool {
        self.listening
    }

    /// True while a frame callback is pending.
    pub fn needs_frame(&self) -> bool {
        self.advance.scheduled
    }

    /// True while the handshake re-send has not fired yet.
    pub fn handshake_pending(&self) -> bool {
        self.handshake_retry_at.is_some()
    }

    /// Runs deferred work: a due handshake re-send and one advance frame.
    ///
    /// Returns true while the handle still needs polling.
    pub fn poll(&mut self) -> bool {
        let now = self.clock.now();
        if let Some(due) = self.handshake_retry_at {
            if now >= due {
                self.handshake_retry_at = None;
                self.send_handshake();
            }
        }
        let frame = self.on_frame();
        frame || self.handshake_retry_at.is_some()
    }

    /// One advance-loop frame. Returns true when the loop continues.
    pub fn on_frame(&mut self) -> bool {
        if !self.advance.scheduled || self.paused || !self.listening {
            self.advance.scheduled = false;
            return false;
        }
        let now = self.clock.now();
        self.advance_estimate(now);
        true
    }

    /// Applies an inbound message if it comes from the bound context and an
    /// allow-listed origin.
    ///
    /// Foreign or malformed messages are expected noise on a shared channel
    /// and are dropped without error.
    pub fn handle_message(&mut self, message: &InboundMessage) -> Option<RemoteEvent> {
        if !self.listening {
            return None;
        }
        if message.source != self.binding.context {
            trace!(source = message.source.0, "message from foreign context dropped");
            return None;
        }
        if !self.policy.allows(&message.origin) {
            trace!(origin = %message.origin, "message from foreign origin dropped");
            return None;
        }
        let state = match parse_state_change(&message.data) {
            Ok(Some(state)) => state,
            Ok(None) => return None,
            Err(error) => {
                trace!(%error, "malformed remote payload dropped");
                return None;
            }
        };

        debug!(id = %self.binding.handshake_id, ?state, "remote state change");
        match state {
            PlayerState::Playing => self.mark_playing(),
            PlayerState::Paused | PlayerState::Ended => self.mark_paused(),
        }
        Some(RemoteEvent::from(state))
    }

    /// Cancels the pending handshake, stops the advance loop and removes the
    /// listener. Idempotent.
    pub fn unbind(&mut self) {
        if !self.listening {
            return;
        }
        self.listening = false;
        self.handshake_retry_at = None;
        self.advance = AdvanceLoop::default();
        self.port.remove_listener(self.binding.context);
        debug!(id = %self.binding.handshake_id, "remote handle unbound");
    }

    fn mark_playing(&mut self) {
        if !self.paused {
            return;
        }
        self.paused = false;
        self.advance.scheduled = true;
        self.advance.last_frame = Some(self.clock.now());
    }

    fn mark_paused(&mut self) {
        if self.paused {
            return;
        }
        let now = self.clock.now();
        self.advance_estimate(now);
        self.paused = true;
        self.advance = AdvanceLoop::default();
    }

    fn advance_estimate(&mut self, now: Instant) {
        if let Some(last) = self.advance.last_frame {
            self.time += elapsed_seconds(now.saturating_duration_since(last), 1.0);
        }
        self.advance.last_frame = Some(now);
    }

    fn send_handshake(&self) {
        let message = OutboundMessage::Listening {
            id: self.binding.handshake_id.clone(),
        };
        debug!(
            id = %self.binding.handshake_id,
            grace_ms = self.handshake_grace.as_millis() as u64,
            "remote handshake sent"
        );
        self.post(&message);
    }

    fn send(&self, command: PlayerCommand) {
        self.post(&command.to_message());
    }

    fn post(&self, message: &OutboundMessage) {
        match message.encode() {
            Ok(encoded) => self.port.post_message(&encoded),
            Err(error) => trace!(%error, "outbound message dropped"),
        }
    }
}

impl<P, C> Playable for RemoteHandle<P, C>
where
    P: MessagePort,
    C: Clock,
{
    fn play(&mut self) {
        if !self.listening {
            return;
        }
        self.send(PlayerCommand::PlayVideo);
        self.mark_playing();
    }

    fn pause(&mut self) {
        if !self.listening {
            return;
        }
        self.send(PlayerCommand::PauseVideo);
        self.mark_paused();
    }

    fn paused(&self) -> bool {
        self.paused
    }

    fn current_time(&self) -> f64 {
        self.time
    }

    fn set_current_time(&mut self, seconds: f64) {
        if !self.listening || !seconds.is_finite() {
            return;
        }
        self.time = seconds.max(0.0);
        if !self.paused {
            self.advance.last_frame = Some(self.clock.now());
        }
        self.send(PlayerCommand::SeekTo {
            seconds: self.time,
            allow_seek_ahead: true,
        });
    }

    fn muted(&self) -> bool {
        self.muted
    }

    fn set_muted(&mut self, muted: bool) {
        if !self.listening {
            return;
        }
        self.muted = muted;
        self.send(if muted {
            PlayerCommand::Mute
        } else {
            PlayerCommand::UnMute
        });
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn set_volume(&mut self, volume: f64) {
        if !self.listening {
            return;
        }
        self.volume = clamp_volume(volume);
        self.send(PlayerCommand::SetVolume(self.volume));
    }
}

impl<P, C> Drop for RemoteHandle<P, C>
where
    P: MessagePort,
    C: Clock,
{
    fn drop(&mut self) {
        self.unbind();
    }
}
