//! InfluxDB HTTP Client
//!
//! Speaks the InfluxDB 1.x HTTP API: `POST /write` with a line protocol body
//! and `GET /ping` for liveness.

use super::{line_protocol, BatchPoints, ConnectionSettings, Connector, Pong, StoreClient};
use crate::error::{ReporterError, Result};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, RequestBuilder, Response};
use serde::Deserialize;
use std::time::Instant;
use tracing::{debug, trace};
use url::Url;

const WRITE_PATH: &str = "write";
const PING_PATH: &str = "ping";
const VERSION_HEADER: &str = "X-Influxdb-Version";
const USER_AGENT: &str = concat!("influxdb-reporter/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Store client over HTTP.
#[derive(Debug)]
pub struct InfluxClient {
    client: Client,
    settings: ConnectionSettings,
    write_url: Url,
    ping_url: Url,
}

impl InfluxClient {
    pub fn new(settings: ConnectionSettings) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(settings.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ReporterError::Connect(e.to_string()))?;
        let write_url = endpoint(&settings.url, WRITE_PATH)?;
        let ping_url = endpoint(&settings.url, PING_PATH)?;

        Ok(Self {
            client,
            settings,
            write_url,
            ping_url,
        })
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    fn authenticate(&self, request: RequestBuilder) -> RequestBuilder {
        if self.settings.username.is_empty() {
            request
        } else {
            request.basic_auth(&self.settings.username, Some(&self.settings.password))
        }
    }
}

#[async_trait]
impl StoreClient for InfluxClient {
    async fn write(&self, batch: &BatchPoints) -> Result<()> {
        let body = line_protocol::encode_batch(batch);
        if body.is_empty() {
            debug!(database = %batch.database, "Nothing to write after encoding");
            return Ok(());
        }
        let write_error = |status: Option<u16>, message: String| ReporterError::Write {
            database: batch.database.clone(),
            points: batch.len(),
            status,
            message,
        };

        let mut query = vec![
            ("db", batch.database.as_str()),
            ("precision", batch.precision.as_str()),
        ];
        if let Some(rp) = batch.retention_policy.as_deref() {
            query.push(("rp", rp));
        }

        trace!(url = %self.write_url, bytes = body.len(), "Writing batch");
        let request = self
            .client
            .post(self.write_url.clone())
            .query(&query)
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(body);
        let response = self
            .authenticate(request)
            .send()
            .await
            .map_err(|e| write_error(None, e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!(database = %batch.database, points = batch.len(), "Batch written");
            return Ok(());
        }

        Err(write_error(
            Some(status.as_u16()),
            error_message(response).await,
        ))
    }

    async fn ping(&self) -> Result<Pong> {
        let started = Instant::now();
        let response = self
            .authenticate(self.client.get(self.ping_url.clone()))
            .send()
            .await
            .map_err(|e| ReporterError::Ping(e.to_string()))?;
        let latency = started.elapsed();

        let status = response.status();
        if !status.is_success() {
            return Err(ReporterError::Ping(format!(
                "unexpected status {}, {}",
                status.as_u16(),
                error_message(response).await
            )));
        }

        let version = response
            .headers()
            .get(VERSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        Ok(Pong { latency, version })
    }
}

/// Builds [`InfluxClient`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpConnector;

impl Connector for HttpConnector {
    fn connect(&self, settings: &ConnectionSettings) -> Result<Box<dyn StoreClient>> {
        Ok(Box::new(InfluxClient::new(settings.clone())?))
    }
}

/// Append `path` to the base url, keeping any path prefix of a proxied
/// deployment such as `http://host/influx`.
fn endpoint(base: &Url, path: &str) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ReporterError::InvalidUrl {
            url: base.to_string(),
            reason: "url cannot be a base".to_string(),
        })?
        .pop_if_empty()
        .push(path);
    Ok(url)
}

/// Extract the store's error message, which is usually `{"error": "..."}`.
async fn error_message(response: Response) -> String {
    let status = response.status();
    match response.text().await {
        Ok(body) if body.trim().is_empty() => status.to_string(),
        Ok(body) => serde_json::from_str::<ErrorBody>(&body)
            .map(|e| e.error)
            .unwrap_or_else(|_| body.trim().to_string()),
        Err(e) => format!("{}, unable to read response body, {}", status, e),
    }
}
