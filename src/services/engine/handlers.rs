//! Detection and tick handlers for the Engine
//!
//! Every handler takes an explicit `now` (epoch seconds, local wall clock).
//! It stamps `last_seen` and is compared against detection end times for
//! the gap check.

use super::Engine;
use crate::domain::review::{MessageKind, ReviewMessage};
use crate::domain::types::{format_epoch_secs, FrigateEvent};
use crate::io::publisher::ReviewPublisher;
use crate::services::gap_closer::{self, GapCheck};
use crate::services::ghost_detector;
use crate::services::matcher::matches;
use crate::services::projector::project;
use std::time::Instant;
use tracing::{debug, error, info};

impl<P: ReviewPublisher> Engine<P> {
    /// Route one detection into every matching profile's review
    ///
    /// A publish failure is logged and counted; the review keeps the new
    /// state either way.
    pub async fn handle_event_at(&mut self, event: FrigateEvent, now: f64) {
        let process_start = Instant::now();
        let detection = event.after;

        debug!(
            detection_id = %detection.id,
            camera = %detection.camera,
            label = %detection.label,
            active = %detection.is_active(),
            "detection_handled"
        );

        for profile in self.profiles.clone() {
            if !matches(&profile, &detection) {
                continue;
            }
            self.metrics.record_detection_matched();

            let (review, opened) = self.store.get_or_open(&profile, now);
            if opened {
                self.metrics.record_review_opened();
            }

            // The first message of a review has no meaningful before-state
            let before = review.sent_first.then(|| project(review));
            review.upsert_detection(detection.clone(), now);
            let after = project(review);
            let kind = if review.sent_first { MessageKind::Update } else { MessageKind::New };
            let review_id = review.id.clone();

            if !self.publish_updates {
                debug!(review_id = %review_id, profile = %profile.name, kind = %kind.as_str(), "review_publish_disabled");
                continue;
            }

            let message = ReviewMessage { kind, before, after: Some(after) };
            if self.publish(&message, &review_id, &profile.name).await {
                if let Some(review) = self.store.get_mut(&profile.name) {
                    review.mark_published();
                }
            }
        }

        let latency_us = process_start.elapsed().as_micros() as u64;
        self.metrics.record_detection_processed(latency_us);
    }

    /// Sweep every open review: ghost detection first, then gap closing
    ///
    /// Reviews are visited in profile-name order.
    pub async fn tick_at(&mut self, now: f64) {
        for profile_name in self.store.profile_names() {
            self.sweep_ghosts(&profile_name, now).await;
            self.close_if_quiet(&profile_name, now).await;
        }
    }

    async fn sweep_ghosts(&mut self, profile_name: &str, now: f64) {
        let Some(review) = self.store.get_mut(profile_name) else {
            return;
        };

        let closed = ghost_detector::sweep(review, now, self.ghost_timeout);
        if closed.is_empty() {
            return;
        }
        self.metrics.record_ghost_closed(closed.len() as u64);

        if !self.publish_updates {
            return;
        }

        let review_id = review.id.clone();
        let message =
            ReviewMessage { kind: MessageKind::Update, before: None, after: Some(project(review)) };
        self.publish(&message, &review_id, profile_name).await;
    }

    async fn close_if_quiet(&mut self, profile_name: &str, now: f64) {
        let Some(review) = self.store.get(profile_name) else {
            return;
        };

        let check = gap_closer::evaluate(review, now);
        if let GapCheck::Waiting { elapsed_secs, gap_secs } = check {
            debug!(
                review_id = %review.id,
                elapsed_secs = format!("{:.1}", elapsed_secs),
                gap_secs = %gap_secs,
                "review_in_gap"
            );
        }
        if !check.should_close() {
            return;
        }

        let before = project(review);
        let Some(closed) = self.store.close(profile_name) else {
            return;
        };
        let after = project(&closed);

        info!(
            review_id = %closed.id,
            profile = %profile_name,
            event_count = %closed.detections.len(),
            started = %format_epoch_secs(after.start_time),
            ended = %after.end_time.map(format_epoch_secs).unwrap_or_default(),
            "review_closed"
        );
        self.metrics.record_review_closed(profile_name);

        // Sent regardless of the publish-updates flag; the review is gone either way
        let message = ReviewMessage { kind: MessageKind::End, before: Some(before), after: Some(after) };
        self.publish(&message, &closed.id, profile_name).await;
    }

    /// Hand a message to the publisher; true on success
    async fn publish(&self, message: &ReviewMessage, review_id: &str, profile_name: &str) -> bool {
        match self.publisher.publish(&self.topic, message).await {
            Ok(()) => {
                self.metrics.record_published(message.kind);
                debug!(
                    review_id = %review_id,
                    profile = %profile_name,
                    kind = %message.kind.as_str(),
                    topic = %self.topic,
                    "review_published"
                );
                true
            }
            Err(e) => {
                self.metrics.record_publish_failed();
                error!(
                    review_id = %review_id,
                    profile = %profile_name,
                    kind = %message.kind.as_str(),
                    error = %e,
                    "review_publish_failed"
                );
                false
            }
        }
    }
}

