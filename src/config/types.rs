//! Configuration Types

use crate::store::{Precision, TagSet, DEFAULT_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reporter configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReporterConfig {
    /// InfluxDB endpoint, e.g. `http://localhost:8086`
    pub url: String,
    pub database: String,
    pub username: String,
    pub password: String,
    /// Tags added to every point
    pub tags: TagSet,
    /// Report interval
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// Timeout of a single write or ping request
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    pub retention_policy: Option<String>,
    pub precision: Precision,
    /// Send one last batch when shutting down
    pub flush_on_shutdown: bool,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8086".to_string(),
            database: "metrics".to_string(),
            username: String::new(),
            password: String::new(),
            tags: TagSet::new(),
            interval: Duration::from_secs(10),
            timeout: DEFAULT_TIMEOUT,
            retention_policy: None,
            precision: Precision::Nanoseconds,
            flush_on_shutdown: true,
        }
    }
}
