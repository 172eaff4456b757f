//! Detection-to-review correlation engine
//!
//! The Engine is the single decision loop that owns all review state:
//! - Detection handling (profile matching, review open/extend, `new`/`update`)
//! - Ghost sweeps (force-closing detections that went silent)
//! - Gap closing (ending reviews once activity has stopped for long enough)
//!
//! Detections arrive through a bounded queue; ticks come from a 1 s
//! interval. Nothing else touches the review store, so it needs no locks.

mod handlers;

use crate::domain::review::ReviewInstance;
use crate::domain::types::{epoch_secs, FrigateEvent, Profile};
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::io::publisher::ReviewPublisher;
use crate::services::ghost_detector::DEFAULT_GHOST_TIMEOUT_SECS;
use crate::services::review_store::ReviewStore;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::info;

/// Pending detections the ingest queue holds before producers block
pub const INGEST_QUEUE_CAPACITY: usize = 100;

/// Period of the ghost/gap sweep
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Create the bounded queue between the subscriber and the engine
pub fn create_ingest_channel() -> (mpsc::Sender<FrigateEvent>, mpsc::Receiver<FrigateEvent>) {
    mpsc::channel(INGEST_QUEUE_CAPACITY)
}

/// Correlates detections into reviews and publishes their lifecycle
pub struct Engine<P> {
    /// Matching rules, evaluated independently for every detection
    pub(crate) profiles: Vec<Arc<Profile>>,
    /// Open reviews keyed by profile name
    pub(crate) store: ReviewStore,
    /// Outbound message capability
    pub(crate) publisher: P,
    /// Topic every review message goes to
    pub(crate) topic: String,
    /// When false, `new`/`update` messages are computed but not sent
    pub(crate) publish_updates: bool,
    /// Silence after which an active detection is force-closed
    pub(crate) ghost_timeout: Duration,
    /// Metrics collector
    pub(crate) metrics: Arc<Metrics>,
}

impl<P: ReviewPublisher> Engine<P> {
    /// Create an engine with default ghost timeout and publishing enabled
    pub fn new(profiles: Vec<Profile>, publisher: P, topic: impl Into<String>) -> Self {
        Self {
            profiles: profiles.into_iter().map(Arc::new).collect(),
            store: ReviewStore::new(),
            publisher,
            topic: topic.into(),
            publish_updates: true,
            ghost_timeout: Duration::from_secs(DEFAULT_GHOST_TIMEOUT_SECS),
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Create an engine from the loaded configuration
    pub fn from_config(config: &Config, publisher: P, metrics: Arc<Metrics>) -> Self {
        Self::new(config.profiles().to_vec(), publisher, config.mqtt_reviews_topic())
            .with_ghost_timeout(Duration::from_secs(config.ghost_timeout_secs()))
            .with_publish_updates(config.publish_updates())
            .with_metrics(metrics)
    }

    pub fn with_ghost_timeout(mut self, timeout: Duration) -> Self {
        self.ghost_timeout = timeout;
        self
    }

    pub fn with_publish_updates(mut self, publish_updates: bool) -> Self {
        self.publish_updates = publish_updates;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Run the decision loop until every sender of the ingest queue is dropped
    pub async fn run(&mut self, mut event_rx: mpsc::Receiver<FrigateEvent>) {
        let mut tick_interval = interval(TICK_INTERVAL);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            profiles = %self.profiles.len(),
            publish_updates = %self.publish_updates,
            ghost_timeout_secs = %self.ghost_timeout.as_secs(),
            "engine_started"
        );

        loop {
            tokio::select! {
                // Process incoming detections
                event = event_rx.recv() => {
                    match event {
                        Some(e) => self.handle_event(e).await,
                        None => break, // Channel closed
                    }
                }
                // Periodic ghost/gap sweep
                _ = tick_interval.tick() => {
                    self.tick().await;
                }
            }
        }

        info!(open_reviews = %self.store.len(), "engine_stopped");
    }

    /// Handle a detection at the current wall-clock time
    pub async fn handle_event(&mut self, event: FrigateEvent) {
        self.handle_event_at(event, epoch_secs()).await;
    }

    /// Run one sweep at the current wall-clock time
    pub async fn tick(&mut self) {
        self.tick_at(epoch_secs()).await;
    }

    /// Open review for a profile, if any
    pub fn review(&self, profile_name: &str) -> Option<&ReviewInstance> {
        self.store.get(profile_name)
    }

    /// Number of open reviews
    pub fn open_reviews(&self) -> usize {
        self.store.len()
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }
}
