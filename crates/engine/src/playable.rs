use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::error::Result;
use crate::time::clamp_volume;
use tracing::debug;

/// Uniform transport surface implemented once per media backend.
///
/// Every operation is infallible: a backend that is gone or not ready drops
/// the call. `volume` is expressed in the `0..=100` range and writes clamp
/// out-of-range input.
pub trait Playable {
    /// Starts playback from the current position. Idempotent.
    fn play(&mut self);

    /// Stops playback. Idempotent.
    fn pause(&mut self);

    /// Last known play/pause state.
    fn paused(&self) -> bool;

    /// Current position estimate in seconds.
    fn current_time(&self) -> f64;

    /// Seeks to `seconds`.
    fn set_current_time(&mut self, seconds: f64);

    fn muted(&self) -> bool;

    fn set_muted(&mut self, muted: bool);

    fn volume(&self) -> f64;

    fn set_volume(&mut self, volume: f64);
}

/// Owning handle kept by the view that mounted the backend.
pub type SharedPlayable = Rc<RefCell<dyn Playable>>;

/// Back-reference kept by the store. It never extends backend lifetime.
pub type WeakPlayable = Weak<RefCell<dyn Playable>>;

/// Wraps a concrete playable into a [`SharedPlayable`].
pub fn share<P>(playable: P) -> SharedPlayable
where
    P: Playable + 'static,
{
    Rc::new(RefCell::new(playable))
}

/// Synchronous media element such as a native audio or video player.
///
/// Volume is in the element's native `0.0..=1.0` range.
pub trait MediaElement {
    /// Requests playback. May be rejected by the element, e.g. by an
    /// autoplay policy.
    fn play(&mut self) -> Result<()>;

    fn pause(&mut self);

    fn is_paused(&self) -> bool;

    fn position(&self) -> f64;

    fn seek(&mut self, seconds: f64);

    fn is_muted(&self) -> bool;

    fn set_muted(&mut self, muted: bool);

    fn level(&self) -> f64;

    fn set_level(&mut self, level: f64);
}

/// [`Playable`] over a synchronous [`MediaElement`].
///
/// Reads go straight to the element; there is no local estimate.
#[derive(Debug)]
pub struct DirectHandle<E> {
    element: E,
}

impl<E> DirectHandle<E>
where
    E: MediaElement,
{
    pub fn new(element: E) -> Self {
        Self { element }
    }

    pub fn element(&self) -> &E {
        &self.element
    }

    pub fn into_inner(self) -> E {
        self.element
    }
}

impl<E> Playable for DirectHandle<E>
where
    E: MediaElement,
{
    fn play(&mut self) {
        if !self.element.is_paused() {
            return;
        }
        if let Err(error) = self.element.play() {
            debug!(%error, "direct playback request dropped");
        }
    }

    fn pause(&mut self) {
        if self.element.is_paused() {
            return;
        }
        self.element.pause();
    }

    fn paused(&self) -> bool {
        self.element.is_paused()
    }

    fn current_time(&self) -> f64 {
        self.element.position()
    }

    fn set_current_time(&mut self, seconds: f64) {
        if !seconds.is_finite() {
            return;
        }
        self.element.seek(seconds.max(0.0));
    }

    fn muted(&self) -> bool {
        self.element.is_muted()
    }

    fn set_muted(&mut self, muted: bool) {
        self.element.set_muted(muted);
    }

    fn volume(&self) -> f64 {
        clamp_volume(self.element.level() * 100.0)
    }

    fn set_volume(&mut self, volume: f64) {
        self.element.set_level(clamp_volume(volume) / 100.0);
    }
}
