//! Store Module
//!
//! The time-series store seen by the reporter: data points, their wire
//! encoding, and the client used to write and ping.

pub mod client;
pub mod line_protocol;
pub mod point;

pub use client::{HttpConnector, InfluxClient};
pub use point::{BatchPoints, FieldValue, Point, Precision, TagSet};

use crate::error::{ReporterError, Result};
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Default timeout of a single write or ping request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of a successful ping.
#[derive(Debug, Clone, PartialEq)]
pub struct Pong {
    pub latency: Duration,
    pub version: String,
}

/// Transport to the store.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Write the batch in a single request.
    async fn write(&self, batch: &BatchPoints) -> Result<()>;

    /// Lightweight liveness probe.
    async fn ping(&self) -> Result<Pong>;
}

/// Creates store clients, used for both the initial connection and every
/// reconnect.
pub trait Connector: Send + Sync {
    fn connect(&self, settings: &ConnectionSettings) -> Result<Box<dyn StoreClient>>;
}

/// Everything needed to build a client.
#[derive(Clone, PartialEq)]
pub struct ConnectionSettings {
    pub url: Url,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
}

impl ConnectionSettings {
    /// Parse and validate the store endpoint.
    ///
    /// Only absolute `http` and `https` urls are accepted.
    pub fn new(url: &str, username: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        let parsed = Url::parse(url).map_err(|e| ReporterError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ReporterError::InvalidUrl {
                url: url.to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }
        if parsed.cannot_be_a_base() || parsed.host_str().is_none() {
            return Err(ReporterError::InvalidUrl {
                url: url.to_string(),
                reason: "missing host".to_string(),
            });
        }

        Ok(Self {
            url: parsed,
            username: username.into(),
            password: password.into(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("url", &self.url.as_str())
            .field("username", &self.username)
            .field("password", &"***")
            .field("timeout", &self.timeout)
            .finish()
    }
}
