//! In-memory store of open reviews
//!
//! Keyed by profile name: a profile has at most one open review at a time.
//! Owned by the engine's decision loop, so it needs no locking.

use crate::domain::review::{ReviewInstance, ReviewLifecycle};
use crate::domain::types::Profile;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Default)]
pub struct ReviewStore {
    reviews: FxHashMap<String, ReviewInstance>,
}

impl ReviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the profile's open review, opening a new one if there is none
    ///
    /// The bool is true when the review was just created.
    pub fn get_or_open(&mut self, profile: &Arc<Profile>, now: f64) -> (&mut ReviewInstance, bool) {
        let mut opened = false;
        let review = self.reviews.entry(profile.name.clone()).or_insert_with(|| {
            opened = true;
            let review = ReviewInstance::new(Arc::clone(profile), now);
            info!(review_id = %review.id, profile = %profile.name, "review_opened");
            review
        });
        (review, opened)
    }

    pub fn get(&self, profile_name: &str) -> Option<&ReviewInstance> {
        self.reviews.get(profile_name)
    }

    pub fn get_mut(&mut self, profile_name: &str) -> Option<&mut ReviewInstance> {
        self.reviews.get_mut(profile_name)
    }

    /// End a review and evict it from the store
    ///
    /// The returned instance carries `ReviewLifecycle::Ended`.
    pub fn close(&mut self, profile_name: &str) -> Option<ReviewInstance> {
        let mut review = self.reviews.remove(profile_name)?;
        review.lifecycle = ReviewLifecycle::Ended;
        Some(review)
    }

    /// Profile names with an open review, sorted for a stable sweep order
    pub fn profile_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.reviews.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.reviews.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }
}
