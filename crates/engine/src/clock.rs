use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use tracing::{info, trace};

/// Monotonic time source.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall-clock source used by production wiring.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for offline simulation and tests.
///
/// Clones share the same position.
///
/// # Example
/// ```
/// use std::time::Duration;
///
/// use timeline_engine::clock::{Clock, ManualClock};
///
/// let clock = ManualClock::new();
/// let start = clock.now();
/// clock.clone().advance(Duration::from_millis(250));
/// assert_eq!(clock.now() - start, Duration::from_millis(250));
/// ```
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    offset: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Rc::new(Cell::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, delta: Duration) {
        self.offset.set(self.offset.get() + delta);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.offset.get()
    }
}

/// Permission to run one scheduled tick.
///
/// Tokens are neither `Clone` nor `Copy`: each running loop owns exactly one
/// token at a time, so a loop cannot fork itself.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a dropped tick token ends the tick loop"]
pub struct TickToken {
    generation: u64,
}

/// Start/stop state of the tick loop.
///
/// Stopping bumps the generation so that every token already handed to the
/// scheduler is rejected when its callback eventually runs.
#[derive(Debug, Default)]
pub struct ClockDriver {
    running: bool,
    generation: u64,
    last_tick: Option<Instant>,
}

impl ClockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Starts the loop. Returns a token only on a stopped-to-running
    /// transition; starting a running driver yields `None`.
    pub fn start(&mut self, now: Instant) -> Option<TickToken> {
        if self.running {
            trace!(generation = self.generation, "clock already running");
            return None;
        }
        self.running = true;
        self.generation = self.generation.wrapping_add(1);
        self.last_tick = Some(now);
        info!(generation = self.generation, "clock started");
        Some(TickToken {
            generation: self.generation,
        })
    }

    /// Stops the loop and invalidates outstanding tokens. Idempotent.
    pub fn stop(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.running = false;
        self.generation = self.generation.wrapping_add(1);
        self.last_tick = None;
        info!(generation = self.generation, "clock stopped");
        true
    }

    /// Validates `token` at the top of a scheduled callback and returns the
    /// wall-clock delta since the previous tick.
    pub fn accept(&mut self, token: &TickToken, now: Instant) -> Option<Duration> {
        if !self.running || token.generation != self.generation {
            trace!(
                token = token.generation,
                current = self.generation,
                "stale tick ignored"
            );
            return None;
        }
        let delta = self
            .last_tick
            .map_or(Duration::ZERO, |last| now.saturating_duration_since(last));
        self.last_tick = Some(now);
        Some(delta)
    }

    /// Token for the next scheduled tick of the current loop.
    pub(crate) fn reschedule(&self, token: TickToken) -> Option<TickToken> {
        (self.running && token.generation == self.generation).then_some(token)
    }
}
