//! Shared types for the review stitcher
//!
//! Detections arrive in Frigate's event shape; profiles come from config.

use serde::{Deserialize, Deserializer, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

/// Generate a new UUIDv7 (time-sortable)
pub fn new_uuid_v7() -> String {
    Uuid::now_v7().to_string()
}

/// Current wall-clock time as fractional epoch seconds
///
/// Same unit as Frigate's `start_time`/`end_time`, but a different clock:
/// those come from the NVR host and may lag or drift relative to this one.
#[inline]
pub fn epoch_secs() -> f64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs_f64()
}

/// Render fractional epoch seconds as RFC 3339 (UTC) for logs
///
/// Falls back to the raw number when the value is out of range.
pub fn format_epoch_secs(secs: f64) -> String {
    OffsetDateTime::from_unix_timestamp_nanos((secs * 1e9) as i128)
        .ok()
        .and_then(|dt| dt.format(&Rfc3339).ok())
        .unwrap_or_else(|| format!("{secs:.3}"))
}

/// One detection message from the event bus (`frigate/events`)
///
/// Only `after` is used by the engine; `before` is kept for logging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrigateEvent {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub before: DetectionState,
    pub after: DetectionState,
}

impl FrigateEvent {
    /// Wrap a detection state as an `update` message (used for snapshot replay)
    pub fn update(after: DetectionState) -> Self {
        Self { kind: "update".to_string(), before: DetectionState::default(), after }
    }
}

/// State of a single tracked object as reported by the NVR
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionState {
    pub id: String,
    #[serde(default)]
    pub camera: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub start_time: f64,
    /// 0 while the detection is still in progress
    #[serde(default, deserialize_with = "null_as_default")]
    pub end_time: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub current_zones: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub entered_zones: Vec<String>,
}

impl DetectionState {
    #[inline]
    pub fn is_active(&self) -> bool {
        self.end_time == 0.0
    }
}

/// Frigate sends explicit `null` for fields that are not known yet
/// (notably `end_time` while an object is still tracked).
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A user-defined matching rule grouping detections into reviews
///
/// Empty `cameras`, `labels` or `required_zones` act as wildcards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    #[serde(default)]
    pub cameras: Vec<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub required_zones: Vec<String>,
    /// Quiet seconds after the last detection ends before the review closes
    #[serde(default)]
    pub gap: u64,
}
