//! Integration tests for configuration loading

use review_stitcher::infra::{Config, EgressMode, LogFormat};
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
publish_updates = false
event_timeout = 120

[mqtt]
host = "test-host"
port = 1884
client_id = "stitcher-test"
username = "frigate"
password = "secret"
events_topic = "nvr/events"
reviews_topic = "nvr/reviews"

[frigate]
url = "http://frigate.local:5000"
timeout_ms = 2500

[logging]
level = "debug"
format = "json"

[metrics]
interval_secs = 15
prometheus_port = 9091

[egress]
mode = "jsonl"
file = "/tmp/reviews.jsonl"

[[profiles]]
name = "driveway"
cameras = ["driveway"]
labels = ["car", "person"]
required_zones = ["apron"]
gap = 30

[[profiles]]
name = "anything"
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.mqtt_host(), "test-host");
    assert_eq!(config.mqtt_port(), 1884);
    assert_eq!(config.mqtt_client_id(), "stitcher-test");
    assert_eq!(config.mqtt_username(), Some("frigate"));
    assert_eq!(config.mqtt_password(), Some("secret"));
    assert_eq!(config.mqtt_events_topic(), "nvr/events");
    assert_eq!(config.mqtt_reviews_topic(), "nvr/reviews");
    assert_eq!(config.frigate_url(), Some("http://frigate.local:5000"));
    assert_eq!(config.frigate_timeout_ms(), 2500);
    assert_eq!(config.log_level(), "debug");
    assert_eq!(config.log_format(), LogFormat::Json);
    assert_eq!(config.metrics_interval_secs(), 15);
    assert_eq!(config.prometheus_port(), 9091);
    assert_eq!(config.egress_mode(), EgressMode::Jsonl);
    assert_eq!(config.egress_file(), "/tmp/reviews.jsonl");
    assert!(!config.publish_updates());
    assert_eq!(config.ghost_timeout_secs(), 120);
    assert_eq!(config.config_file(), temp_file.path().display().to_string());

    let profiles = config.profiles();
    assert_eq!(profiles.len(), 2);
    assert_eq!(profiles[0].name, "driveway");
    assert_eq!(profiles[0].labels, vec!["car".to_string(), "person".to_string()]);
    assert_eq!(profiles[0].required_zones, vec!["apron".to_string()]);
    assert_eq!(profiles[0].gap, 30);
    assert!(profiles[1].cameras.is_empty());
    assert_eq!(profiles[1].gap, 0);
}

#[test]
fn test_minimal_file_gets_defaults() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[[profiles]]\nname = \"p\"\n").unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.mqtt_host(), "localhost");
    assert_eq!(config.mqtt_port(), 1883);
    assert_eq!(config.mqtt_events_topic(), "frigate/events");
    assert_eq!(config.frigate_url(), None);
    assert_eq!(config.egress_mode(), EgressMode::Mqtt);
    assert!(config.publish_updates());
    assert_eq!(config.ghost_timeout_secs(), 300);
}

#[test]
fn test_missing_file_is_an_error() {
    let result = Config::from_file("/nonexistent/path/config.toml");
    let err = result.unwrap_err();
    assert!(format!("{err:#}").contains("Failed to read config file"));
}

#[test]
fn test_invalid_toml_is_an_error() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"this is not [valid toml").unwrap();
    temp_file.flush().unwrap();

    let err = Config::from_file(temp_file.path()).unwrap_err();
    assert!(format!("{err:#}").contains("Failed to parse config file"));
}

#[test]
fn test_duplicate_profile_names_rejected() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file
        .write_all(b"[[profiles]]\nname = \"p\"\n\n[[profiles]]\nname = \"p\"\n")
        .unwrap();
    temp_file.flush().unwrap();

    let err = Config::from_file(temp_file.path()).unwrap_err();
    assert!(format!("{err:#}").contains("duplicate profile name 'p'"));
}
