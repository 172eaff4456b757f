//! Profile matching for incoming detections

use crate::domain::types::{DetectionState, Profile};

/// Check whether a detection belongs to a profile
///
/// Camera and label lists act as allow-lists (empty = any). Required zones
/// only reject once the detection reports entered zones: a detection with no
/// zone information yet is let through.
pub fn matches(profile: &Profile, state: &DetectionState) -> bool {
    if !profile.cameras.is_empty() && !profile.cameras.contains(&state.camera) {
        return false;
    }

    if !profile.labels.is_empty() && !profile.labels.contains(&state.label) {
        return false;
    }

    if !profile.required_zones.is_empty()
        && !state.entered_zones.is_empty()
        && !zones_overlap(&profile.required_zones, &state.entered_zones)
    {
        return false;
    }

    true
}

fn zones_overlap(a: &[String], b: &[String]) -> bool {
    a.iter().any(|zone| b.contains(zone))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn profile(cameras: &[&str], labels: &[&str], zones: &[&str]) -> Profile {
        Profile {
            name: "test".to_string(),
            cameras: strings(cameras),
            labels: strings(labels),
            required_zones: strings(zones),
            gap: 30,
        }
    }

    fn detection(camera: &str, label: &str, entered: &[&str]) -> DetectionState {
        DetectionState {
            id: "e1".to_string(),
            camera: camera.to_string(),
            label: label.to_string(),
            entered_zones: strings(entered),
            ..Default::default()
        }
    }

    #[test]
    fn test_exact_match() {
        assert!(matches(&profile(&["cam1"], &["person"], &[]), &detection("cam1", "person", &[])));
    }

    #[test]
    fn test_camera_mismatch() {
        assert!(!matches(&profile(&["cam1"], &["person"], &[]), &detection("cam2", "person", &[])));
    }

    #[test]
    fn test_label_mismatch() {
        assert!(!matches(&profile(&["cam1"], &["person"], &[]), &detection("cam1", "dog", &[])));
    }

    #[test]
    fn test_zone_match() {
        let p = profile(&["cam1"], &[], &["zoneA"]);
        assert!(matches(&p, &detection("cam1", "person", &["zoneB", "zoneA"])));
    }

    #[test]
    fn test_zone_match_only() {
        let p = profile(&[], &[], &["zoneA"]);
        assert!(matches(&p, &detection("any", "any", &["zoneB", "zoneA"])));
    }

    #[test]
    fn test_zone_mismatch() {
        let p = profile(&["cam1"], &[], &["zoneA"]);
        assert!(!matches(&p, &detection("cam1", "person", &["zoneB", "zoneC"])));
    }

    #[test]
    fn test_no_zone_info_is_not_blocking() {
        let p = profile(&[], &[], &["zoneA"]);
        assert!(matches(&p, &detection("cam1", "person", &[])));
    }

    #[test]
    fn test_current_zones_are_ignored() {
        let p = profile(&[], &[], &["zoneA"]);
        let mut state = detection("cam1", "person", &["zoneB"]);
        state.current_zones = strings(&["zoneA"]);
        assert!(!matches(&p, &state));
    }

    #[test]
    fn test_wildcard_profile_matches_anything() {
        let p = profile(&[], &[], &[]);
        for (camera, label, zones) in [
            ("cam99", "ufo", vec![]),
            ("", "", vec!["somewhere"]),
            ("driveway", "car", vec!["road", "lawn"]),
        ] {
            assert!(matches(&p, &detection(camera, label, &zones)));
        }
    }
}
