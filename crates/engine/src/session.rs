use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::store::TimelineStore;
use crate::timeline::{Fingerprint, TimelineDescription};
use tracing::{debug, info};

/// What [`TimelineSession::sync`] did with a description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// No store existed; one was created.
    Created,
    /// The fingerprint matched; the store was left untouched.
    Unchanged,
    /// The fingerprint changed; the store was updated in place.
    Replaced,
}

/// Holds the single store of a timeline editing session across re-renders.
///
/// Recreating the store on every render would reset playback, so a new
/// description only replaces the current one when its fingerprint
/// `(duration, items, keyframes)` differs. Content changes that keep the
/// counts are not detected.
#[derive(Debug)]
pub struct TimelineSession<C = SystemClock>
where
    C: Clock + Clone,
{
    clock: C,
    config: EngineConfig,
    store: Option<TimelineStore<C>>,
    fingerprint: Option<Fingerprint>,
}

impl TimelineSession<SystemClock> {
    pub fn with_system_clock(config: EngineConfig) -> Self {
        Self::new(SystemClock, config)
    }
}

impl<C> TimelineSession<C>
where
    C: Clock + Clone,
{
    pub fn new(clock: C, config: EngineConfig) -> Self {
        Self {
            clock,
            config,
            store: None,
            fingerprint: None,
        }
    }

    /// Reconciles the session with `description`.
    ///
    /// # Example
    /// ```
    /// use timeline_engine::clock::ManualClock;
    /// use timeline_engine::{EngineConfig, SyncOutcome, TimelineDescription, TimelineSession};
    ///
    /// let mut session = TimelineSession::new(ManualClock::new(), EngineConfig::default());
    /// let description = TimelineDescription::from_json_str(r#"{"duration": 10}"#)
    ///     .expect("valid description");
    ///
    /// assert_eq!(session.sync(description.clone()), SyncOutcome::Created);
    /// assert_eq!(session.sync(description), SyncOutcome::Unchanged);
    /// ```
    pub fn sync(&mut self, description: TimelineDescription) -> SyncOutcome {
        let fingerprint = description.fingerprint();
        match self.store.as_mut() {
            None => {
                info!(
                    items = fingerprint.items,
                    keyframes = fingerprint.keyframes,
                    "session store created"
                );
                self.store = Some(TimelineStore::new(
                    description,
                    self.clock.clone(),
                    self.config.clone(),
                ));
                self.fingerprint = Some(fingerprint);
                SyncOutcome::Created
            }
            Some(_) if self.fingerprint == Some(fingerprint) => {
                debug!("description fingerprint unchanged");
                SyncOutcome::Unchanged
            }
            Some(store) => {
                store.replace_timeline(description);
                self.fingerprint = Some(fingerprint);
                SyncOutcome::Replaced
            }
        }
    }

    pub fn store(&self) -> Option<&TimelineStore<C>> {
        self.store.as_ref()
    }

    pub fn store_mut(&mut self) -> Option<&mut TimelineStore<C>> {
        self.store.as_mut()
    }

    pub fn fingerprint(&self) -> Option<Fingerprint> {
        self.fingerprint
    }

    /// Stops the clock and drops the store, e.g. when the consumer unmounts.
    pub fn teardown(&mut self) {
        if let Some(mut store) = self.store.take() {
            store.stop_clock();
            info!("session store dropped");
        }
        self.fingerprint = None;
    }
}

#[cfg(test)]
mod tests {
    use super::{SyncOutcome, TimelineSession};
    use crate::clock::ManualClock;
    use crate::config::EngineConfig;
    use crate::timeline::{
        ItemType, Keyframe, Target, TemporalTarget, TimelineDescription, TimelineItem,
        UntimedActivation,
    };

    #[test]
    fn unchanged_fingerprint_keeps_playhead() {
        let mut session = TimelineSession::new(ManualClock::new(), EngineConfig::default());
        assert_eq!(session.sync(description(10.0, 2)), SyncOutcome::Created);
        session.store_mut().expect("store").set_time(4.0);

        let mut shifted = description(10.0, 2);
        shifted.items[0].target.temporal = Some(TemporalTarget {
            start: 1.0,
            end: 2.0,
        });
        assert_eq!(session.sync(shifted), SyncOutcome::Unchanged);
        assert_eq!(session.store().expect("store").time(), 4.0);
    }

    #[test]
    fn changed_fingerprint_updates_store_in_place() {
        let mut session = TimelineSession::new(ManualClock::new(), EngineConfig::default());
        session.sync(description(10.0, 2));
        {
            let store = session.store_mut().expect("store");
            store.set_time(6.0);
            store.play_pause();
        }

        assert_eq!(session.sync(description(12.0, 3)), SyncOutcome::Replaced);
        let store = session.store().expect("store");
        assert_eq!(store.time(), 0.0);
        assert!(store.visible_elements().is_empty());
        assert_eq!(store.current_prime(), None);
        assert_eq!(store.next_keyframe_index(), 0);
        assert_eq!(store.duration(), 12.0);
        assert!(store.is_playing());
    }

    #[test]
    fn teardown_stops_clock_and_allows_recreation() {
        let mut session = TimelineSession::new(ManualClock::new(), EngineConfig::default());
        session.sync(description(10.0, 1));
        let _token = session.store_mut().expect("store").start_clock();

        session.teardown();
        assert!(session.store().is_none());
        assert_eq!(session.sync(description(10.0, 1)), SyncOutcome::Created);
    }

    #[test]
    fn system_clock_session_reconciles_like_any_other() {
        let mut session = TimelineSession::with_system_clock(EngineConfig::default());
        assert_eq!(session.sync(description(10.0, 1)), SyncOutcome::Created);
        assert_eq!(session.sync(description(10.0, 1)), SyncOutcome::Unchanged);
        assert!(session.store().is_some_and(|store| store.is_ready()));
        session.teardown();
    }

    fn description(duration: f64, items: usize) -> TimelineDescription {
        TimelineDescription {
            duration,
            items: (0..items)
                .map(|index| TimelineItem {
                    id: format!("item-{index}"),
                    annotation_id: format!("anno-{index}"),
                    kind: ItemType::Image,
                    target: Target {
                        temporal: Some(TemporalTarget {
                            start: 5.0 + index as f64,
                            end: 9.0,
                        }),
                        spatial: None,
                    },
                    untimed: UntimedActivation::Always,
                    url: None,
                })
                .collect(),
            keyframes: vec![Keyframe { time: 5.0 }],
            highlights: Vec::new(),
        }
    }
}
