//! Synchronization core for complex timelines.
//!
//! One store owns the clock and derives which timeline items are visible;
//! heterogeneous media backends are driven through the [`Playable`] trait.

pub mod clock;
pub mod config;
pub mod error;
pub mod playable;
pub mod protocol;
pub mod remote;
pub mod resolve;
pub mod session;
pub mod store;
pub mod time;
pub mod timeline;
pub mod viewport;

pub use clock::{Clock, ClockDriver, ManualClock, SystemClock, TickToken};
pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use playable::{DirectHandle, MediaElement, Playable, SharedPlayable, WeakPlayable, share};
pub use remote::{MessagePort, RemoteBinding, RemoteEvent, RemoteHandle};
pub use session::{SyncOutcome, TimelineSession};
pub use store::{Command, Event, Outcome, Snapshot, TimelineStore};
pub use timeline::{Fingerprint, ItemType, TimelineDescription, TimelineItem};
