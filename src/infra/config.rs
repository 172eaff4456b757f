//! Configuration loading from TOML files
//!
//! Config file is selected via `--config <path>` (default: config.toml).
//! A missing or invalid file is fatal; optional fields get documented
//! defaults.

use crate::domain::types::Profile;
use crate::services::ghost_detector::DEFAULT_GHOST_TIMEOUT_SECS;
use anyhow::{bail, Context};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EgressMode {
    Mqtt,
    Jsonl,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MqttConfig {
    #[serde(default = "default_mqtt_host")]
    pub host: String,
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Topic carrying Frigate detection events
    #[serde(default = "default_events_topic")]
    pub events_topic: String,
    /// Topic review messages are published on
    #[serde(default = "default_reviews_topic")]
    pub reviews_topic: String,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: default_mqtt_host(),
            port: default_mqtt_port(),
            client_id: default_client_id(),
            username: None,
            password: None,
            events_topic: default_events_topic(),
            reviews_topic: default_reviews_topic(),
        }
    }
}

fn default_mqtt_host() -> String {
    "localhost".to_string()
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_client_id() -> String {
    "frigate-stitcher".to_string()
}

fn default_events_topic() -> String {
    "frigate/events".to_string()
}

fn default_reviews_topic() -> String {
    "frigate_stitcher/reviews".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct FrigateConfig {
    /// Base URL of the Frigate API; no startup snapshot when absent
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_frigate_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for FrigateConfig {
    fn default() -> Self {
        Self { url: None, timeout_ms: default_frigate_timeout_ms() }
    }
}

fn default_frigate_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), format: default_log_format() }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Text
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_interval")]
    pub interval_secs: u64,
    /// Prometheus metrics HTTP port (0 to disable)
    #[serde(default)]
    pub prometheus_port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval(), prometheus_port: 0 }
    }
}

fn default_metrics_interval() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
pub struct EgressConfig {
    #[serde(default = "default_egress_mode")]
    pub mode: EgressMode,
    /// File path for JSONL egress
    #[serde(default = "default_egress_file")]
    pub file: String,
}

impl Default for EgressConfig {
    fn default() -> Self {
        Self { mode: default_egress_mode(), file: default_egress_file() }
    }
}

fn default_egress_mode() -> EgressMode {
    EgressMode::Mqtt
}

fn default_egress_file() -> String {
    "reviews.jsonl".to_string()
}

fn default_publish_updates() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub frigate: FrigateConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub egress: EgressConfig,
    #[serde(default)]
    pub profiles: Vec<Profile>,
    #[serde(default = "default_publish_updates")]
    pub publish_updates: bool,
    /// Ghost timeout in seconds; 0 means default
    #[serde(default)]
    pub event_timeout: u64,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    mqtt_host: String,
    mqtt_port: u16,
    mqtt_client_id: String,
    mqtt_username: Option<String>,
    mqtt_password: Option<String>,
    mqtt_events_topic: String,
    mqtt_reviews_topic: String,
    frigate_url: Option<String>,
    frigate_timeout_ms: u64,
    log_level: String,
    log_format: LogFormat,
    metrics_interval_secs: u64,
    prometheus_port: u16,
    egress_mode: EgressMode,
    egress_file: String,
    profiles: Vec<Profile>,
    publish_updates: bool,
    ghost_timeout_secs: u64,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mqtt_host: default_mqtt_host(),
            mqtt_port: default_mqtt_port(),
            mqtt_client_id: default_client_id(),
            mqtt_username: None,
            mqtt_password: None,
            mqtt_events_topic: default_events_topic(),
            mqtt_reviews_topic: default_reviews_topic(),
            frigate_url: None,
            frigate_timeout_ms: default_frigate_timeout_ms(),
            log_level: default_log_level(),
            log_format: LogFormat::Text,
            metrics_interval_secs: default_metrics_interval(),
            prometheus_port: 0,
            egress_mode: EgressMode::Mqtt,
            egress_file: default_egress_file(),
            profiles: Vec::new(),
            publish_updates: default_publish_updates(),
            ghost_timeout_secs: DEFAULT_GHOST_TIMEOUT_SECS,
            config_file: "default".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let mut config = Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.config_file = path.display().to_string();
        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let toml_config: TomlConfig = toml::from_str(content)?;
        validate_profiles(&toml_config.profiles)?;

        let ghost_timeout_secs = match toml_config.event_timeout {
            0 => DEFAULT_GHOST_TIMEOUT_SECS,
            secs => secs,
        };

        Ok(Self {
            mqtt_host: toml_config.mqtt.host,
            mqtt_port: toml_config.mqtt.port,
            mqtt_client_id: toml_config.mqtt.client_id,
            mqtt_username: toml_config.mqtt.username,
            mqtt_password: toml_config.mqtt.password,
            mqtt_events_topic: toml_config.mqtt.events_topic,
            mqtt_reviews_topic: toml_config.mqtt.reviews_topic,
            frigate_url: toml_config.frigate.url.filter(|url| !url.is_empty()),
            frigate_timeout_ms: toml_config.frigate.timeout_ms,
            log_level: toml_config.logging.level,
            log_format: toml_config.logging.format,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            prometheus_port: toml_config.metrics.prometheus_port,
            egress_mode: toml_config.egress.mode,
            egress_file: toml_config.egress.file,
            profiles: toml_config.profiles,
            publish_updates: toml_config.publish_updates,
            ghost_timeout_secs,
            config_file: "inline".to_string(),
        })
    }

    // Getters for all config fields
    pub fn mqtt_host(&self) -> &str {
        &self.mqtt_host
    }

    pub fn mqtt_port(&self) -> u16 {
        self.mqtt_port
    }

    pub fn mqtt_client_id(&self) -> &str {
        &self.mqtt_client_id
    }

    pub fn mqtt_username(&self) -> Option<&str> {
        self.mqtt_username.as_deref()
    }

    pub fn mqtt_password(&self) -> Option<&str> {
        self.mqtt_password.as_deref()
    }

    pub fn mqtt_events_topic(&self) -> &str {
        &self.mqtt_events_topic
    }

    pub fn mqtt_reviews_topic(&self) -> &str {
        &self.mqtt_reviews_topic
    }

    pub fn frigate_url(&self) -> Option<&str> {
        self.frigate_url.as_deref()
    }

    pub fn frigate_timeout_ms(&self) -> u64 {
        self.frigate_timeout_ms
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn prometheus_port(&self) -> u16 {
        self.prometheus_port
    }

    pub fn egress_mode(&self) -> EgressMode {
        self.egress_mode
    }

    pub fn egress_file(&self) -> &str {
        &self.egress_file
    }

    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    pub fn publish_updates(&self) -> bool {
        self.publish_updates
    }

    pub fn ghost_timeout_secs(&self) -> u64 {
        self.ghost_timeout_secs
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method for tests to set profiles
    #[cfg(test)]
    pub fn with_profiles(mut self, profiles: Vec<Profile>) -> Self {
        self.profiles = profiles;
        self
    }
}

/// Profile names key the review store, so they must be present and unique
fn validate_profiles(profiles: &[Profile]) -> anyhow::Result<()> {
    let mut seen = HashSet::new();
    for profile in profiles {
        if profile.name.trim().is_empty() {
            bail!("profile with empty name");
        }
        if !seen.insert(profile.name.as_str()) {
            bail!("duplicate profile name '{}'", profile.name);
        }
    }
    Ok(())
}
