use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use crate::clock::{Clock, ClockDriver, SystemClock, TickToken};
use crate::config::EngineConfig;
use crate::playable::{Playable, SharedPlayable, WeakPlayable};
use crate::resolve::resolve;
use crate::time::{clamp_time, elapsed_seconds};
use crate::timeline::{AnnotationId, ItemId, TimelineDescription};
use tracing::{debug, info, trace};

/// Commands accepted by the store.
#[derive(Debug, PartialEq)]
pub enum Command {
    SetTime { time: f64 },
    PlayPause,
    StartClock,
    StopClock,
    /// Runs one scheduled tick of the clock loop.
    Tick(TickToken),
}

/// Events emitted by the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    TimeChanged { time: f64 },
    VisibilityChanged { visible: BTreeSet<AnnotationId> },
    PrimeChanged { prime: Option<ItemId> },
    KeyframeCursorChanged { next_index: usize },
    /// Emitted when "some video item is visible" flips.
    VideoPresenceChanged(bool),
    PlaybackIntentChanged { playing: bool },
    ClockStateChanged { running: bool },
}

/// Result of one command: emitted events plus the token for the next tick
/// when the clock loop must be rescheduled.
#[derive(Debug, Default)]
pub struct Outcome {
    pub events: Vec<Event>,
    pub next_tick: Option<TickToken>,
}

/// Immutable state snapshot consumed by the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub time: f64,
    pub is_ready: bool,
    pub visible_elements: BTreeSet<AnnotationId>,
    pub current_prime: Option<ItemId>,
    pub next_keyframe_index: usize,
    pub has_visible_video: bool,
    pub playing: bool,
    pub clock_running: bool,
}

/// Authoritative clock and active-item state of one timeline session.
///
/// All mutation goes through action methods. Each action recomputes
/// visibility and the keyframe cursor from one consistent
/// `(description, time)` pair before returning.
#[derive(Debug)]
pub struct TimelineStore<C = SystemClock>
where
    C: Clock,
{
    description: TimelineDescription,
    time: f64,
    is_ready: bool,
    visible: BTreeSet<AnnotationId>,
    prime: Option<ItemId>,
    next_keyframe_index: usize,
    has_visible_video: bool,
    handles: HashMap<AnnotationId, WeakPlayable>,
    playing: bool,
    driver: ClockDriver,
    clock: C,
    config: EngineConfig,
}

impl TimelineStore<SystemClock> {
    /// Creates a store driven by the wall clock.
    pub fn with_system_clock(description: TimelineDescription, config: EngineConfig) -> Self {
        Self::new(description, SystemClock, config)
    }
}

impl<C> TimelineStore<C>
where
    C: Clock,
{
    /// Creates a store seeded with `description` at time `0`.
    ///
    /// The initial active set is resolved immediately, so the store is ready
    /// on return.
    ///
    /// # Example
    /// ```
    /// use timeline_engine::clock::ManualClock;
    /// use timeline_engine::{EngineConfig, TimelineDescription, TimelineStore};
    ///
    /// let description = TimelineDescription::from_json_str(r#"{"duration": 10}"#)
    ///     .expect("valid description");
    /// let mut store = TimelineStore::new(description, ManualClock::new(), EngineConfig::default());
    ///
    /// store.set_time(25.0);
    /// assert_eq!(store.time(), 10.0);
    /// assert!(store.is_ready());
    /// ```
    pub fn new(description: TimelineDescription, clock: C, config: EngineConfig) -> Self {
        info!(
            duration = description.duration,
            items = description.items.len(),
            keyframes = description.keyframes.len(),
            "timeline store created"
        );
        let mut store = Self {
            description,
            time: 0.0,
            is_ready: false,
            visible: BTreeSet::new(),
            prime: None,
            next_keyframe_index: 0,
            has_visible_video: false,
            handles: HashMap::new(),
            playing: false,
            driver: ClockDriver::new(),
            clock,
            config,
        };
        store.apply_time(0.0);
        store
    }

    pub fn description(&self) -> &TimelineDescription {
        &self.description
    }

    pub fn duration(&self) -> f64 {
        self.description.duration
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// True once an active set has been resolved. Never reverts.
    pub fn is_ready(&self) -> bool {
        self.is_ready
    }

    pub fn visible_elements(&self) -> &BTreeSet<AnnotationId> {
        &self.visible
    }

    pub fn is_visible(&self, annotation_id: &str) -> bool {
        self.visible.contains(annotation_id)
    }

    pub fn current_prime(&self) -> Option<&str> {
        self.prime.as_deref()
    }

    pub fn next_keyframe_index(&self) -> usize {
        self.next_keyframe_index
    }

    pub fn has_visible_video(&self) -> bool {
        self.has_visible_video
    }

    /// Global play/pause intent toggled by [`TimelineStore::play_pause`].
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn clock_running(&self) -> bool {
        self.driver.is_running()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            time: self.time,
            is_ready: self.is_ready,
            visible_elements: self.visible.clone(),
            current_prime: self.prime.clone(),
            next_keyframe_index: self.next_keyframe_index,
            has_visible_video: self.has_visible_video,
            playing: self.playing,
            clock_running: self.driver.is_running(),
        }
    }

    /// Registers the playable handle for `annotation_id`.
    ///
    /// The last registration wins. Ids unknown to the current description
    /// are kept, since a handle may arrive before the description does. Only
    /// a weak reference is stored.
    pub fn set_element(&mut self, annotation_id: impl Into<AnnotationId>, handle: &SharedPlayable) {
        let annotation_id = annotation_id.into();
        if !self.description.references(&annotation_id) {
            trace!(%annotation_id, "handle registered ahead of description");
        }
        self.handles.insert(annotation_id, Rc::downgrade(handle));
    }

    /// Drops the registration of `annotation_id`, e.g. when its view unmounts.
    pub fn remove_element(&mut self, annotation_id: &str) -> bool {
        self.handles.remove(annotation_id).is_some()
    }

    /// Returns the live handle registered for `annotation_id`.
    pub fn element(&self, annotation_id: &str) -> Option<SharedPlayable> {
        self.handles.get(annotation_id)?.upgrade()
    }

    /// Starts the tick loop.
    ///
    /// Returns the token for the first tick only when the loop was stopped;
    /// the host schedules a callback that passes it to
    /// [`TimelineStore::tick`].
    pub fn start_clock(&mut self) -> Option<TickToken> {
        self.driver.start(self.clock.now())
    }

    /// Stops the tick loop. Queued ticks become no-ops. Idempotent.
    pub fn stop_clock(&mut self) -> bool {
        self.driver.stop()
    }

    /// Runs one scheduled tick.
    ///
    /// The stop condition is checked first, so a tick queued before
    /// [`TimelineStore::stop_clock`] does nothing. While the playback intent
    /// is set, time advances by the measured wall-clock delta. Returns the
    /// token for the next tick, or `None` when the loop has ended.
    pub fn tick(&mut self, token: TickToken) -> Option<TickToken> {
        let delta = self.driver.accept(&token, self.clock.now())?;
        let target = if self.playing {
            self.time + elapsed_seconds(delta, self.config.effective_playback_rate())
        } else {
            self.time
        };
        trace!(time = target, delta_ms = delta.as_millis() as u64, "tick");
        self.apply_time(target);
        self.driver.reschedule(token)
    }

    /// Seeks to `t` clamped to `[0, duration]`.
    ///
    /// Visibility and the keyframe cursor are recomputed before returning.
    pub fn set_time(&mut self, t: f64) {
        debug!(requested = t, "seek");
        self.apply_time(t);
    }

    /// Toggles the playback intent and fans `play`/`pause` out to every
    /// registered handle without waiting for acknowledgment.
    ///
    /// Handles whose backend is gone, or which are busy, are skipped.
    pub fn play_pause(&mut self) {
        self.playing = !self.playing;
        self.handles.retain(|_, handle| handle.strong_count() > 0);

        let mut reached = 0usize;
        for (annotation_id, handle) in &self.handles {
            let Some(handle) = handle.upgrade() else {
                continue;
            };
            let Ok(mut playable) = handle.try_borrow_mut() else {
                trace!(%annotation_id, "handle busy, transport call dropped");
                continue;
            };
            if self.playing {
                playable.play();
            } else {
                playable.pause();
            }
            reached += 1;
        }
        debug!(playing = self.playing, handles = reached, "play/pause fanned out");
    }

    /// Replaces the description in place.
    ///
    /// Cached state is cleared and time is forced to `0` through the seek
    /// path, so the active set is recomputed for the new description.
    /// Registered handles, the playback intent and the clock loop survive.
    pub fn replace_timeline(&mut self, description: TimelineDescription) {
        info!(
            duration = description.duration,
            items = description.items.len(),
            keyframes = description.keyframes.len(),
            "timeline replaced"
        );
        self.description = description;
        self.visible.clear();
        self.prime = None;
        self.next_keyframe_index = 0;
        self.has_visible_video = false;
        self.set_time(0.0);
    }

    /// Applies one command and returns the resulting events.
    pub fn handle_command(&mut self, command: Command) -> Outcome {
        let before = self.snapshot();
        let next_tick = match command {
            Command::SetTime { time } => {
                self.set_time(time);
                None
            }
            Command::PlayPause => {
                self.play_pause();
                None
            }
            Command::StartClock => self.start_clock(),
            Command::StopClock => {
                self.stop_clock();
                None
            }
            Command::Tick(token) => self.tick(token),
        };
        Outcome {
            events: diff_snapshots(&before, &self.snapshot()),
            next_tick,
        }
    }

    fn apply_time(&mut self, t: f64) {
        let time = clamp_time(t, self.description.duration);
        let resolution = resolve(&self.description, time);
        self.time = time;
        self.visible = resolution.visible;
        self.prime = resolution.prime;
        self.next_keyframe_index = resolution.next_keyframe_index;
        self.has_visible_video = resolution.has_visible_video;
        self.is_ready = true;
    }
}

fn diff_snapshots(before: &Snapshot, after: &Snapshot) -> Vec<Event> {
    let mut events = Vec::new();
    if before.time != after.time {
        events.push(Event::TimeChanged { time: after.time });
    }
    if before.visible_elements != after.visible_elements {
        events.push(Event::VisibilityChanged {
            visible: after.visible_elements.clone(),
        });
    }
    if before.current_prime != after.current_prime {
        events.push(Event::PrimeChanged {
            prime: after.current_prime.clone(),
        });
    }
    if before.next_keyframe_index != after.next_keyframe_index {
        events.push(Event::KeyframeCursorChanged {
            next_index: after.next_keyframe_index,
        });
    }
    if before.has_visible_video != after.has_visible_video {
        events.push(Event::VideoPresenceChanged(after.has_visible_video));
    }
    if before.playing != after.playing {
        events.push(Event::PlaybackIntentChanged {
            playing: after.playing,
        });
    }
    if before.clock_running != after.clock_running {
        events.push(Event::ClockStateChanged {
            running: after.clock_running,
        });
    }
    events
}
