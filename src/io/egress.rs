//! Review egress to file
//!
//! Messages are written in JSONL format (one JSON object per line) to the
//! file specified in config, each wrapped with the topic it would have been
//! published on.

use crate::domain::review::ReviewMessage;
use crate::io::publisher::{PublishError, ReviewPublisher};
use async_trait::async_trait;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

#[derive(Serialize)]
struct EgressLine<'a> {
    topic: &'a str,
    message: &'a ReviewMessage,
}

/// JSONL file publisher for review messages
pub struct JsonlPublisher {
    file_path: String,
}

impl JsonlPublisher {
    pub fn new(file_path: &str) -> Self {
        info!(file_path = %file_path, "egress_initialized");
        Self { file_path: file_path.to_string() }
    }

    /// Append a line to the egress file
    fn append_line(&self, line: &str) -> std::io::Result<()> {
        let path = Path::new(&self.file_path);

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;

        writeln!(file, "{}", line)?;
        debug!(file = %self.file_path, bytes = %line.len(), "egress_written");

        Ok(())
    }
}

#[async_trait]
impl ReviewPublisher for JsonlPublisher {
    async fn publish(&self, topic: &str, message: &ReviewMessage) -> Result<(), PublishError> {
        let line = serde_json::to_string(&EgressLine { topic, message })?;
        self.append_line(&line)?;
        Ok(())
    }
}
