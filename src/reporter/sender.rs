//! Batch Sender

use crate::error::Result;
use crate::store::{line_protocol, BatchPoints, Point, Precision, StoreClient};
use tracing::debug;

/// Writes the points of one tick as a single batch.
#[derive(Debug, Clone)]
pub struct BatchSender {
    database: String,
    retention_policy: Option<String>,
    precision: Precision,
}

impl BatchSender {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            retention_policy: None,
            precision: Precision::default(),
        }
    }

    pub fn with_retention_policy(mut self, retention_policy: Option<String>) -> Self {
        self.retention_policy = retention_policy;
        self
    }

    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Build the batch for `points`.
    pub fn batch(&self, points: Vec<Point>) -> BatchPoints {
        BatchPoints {
            points,
            database: self.database.clone(),
            retention_policy: self.retention_policy.clone(),
            precision: self.precision,
        }
    }

    /// Write `points` through `client`, returning how many were sent.
    ///
    /// Nothing is retried or kept on failure. Points without any encodable
    /// field are left out, and a tick with nothing left sends nothing.
    pub async fn send(&self, client: &dyn StoreClient, mut points: Vec<Point>) -> Result<usize> {
        let translated = points.len();
        points.retain(line_protocol::is_encodable);
        if points.len() < translated {
            debug!(
                database = %self.database,
                dropped = translated - points.len(),
                "Dropping points without encodable fields"
            );
        }

        if points.is_empty() {
            debug!(database = %self.database, "No points to send");
            return Ok(0);
        }

        let batch = self.batch(points);
        client.write(&batch).await?;
        Ok(batch.len())
    }
}
