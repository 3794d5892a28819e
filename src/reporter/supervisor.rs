//! Connection Supervisor
//!
//! Owns the store client and replaces it when the store stops answering.

use crate::error::{ReporterError, Result};
use crate::store::{ConnectionSettings, Connector, Pong, StoreClient};
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of a successful health check.
#[derive(Debug, Clone, PartialEq)]
pub enum HealthCheck {
    /// The store answered the ping.
    Healthy(Pong),
    /// The ping failed and a fresh client was created.
    Reconnected { cause: ReporterError },
}

/// Holds the single live client handle.
pub struct ConnectionSupervisor {
    connector: Arc<dyn Connector>,
    settings: ConnectionSettings,
    client: Box<dyn StoreClient>,
    reconnects: u64,
}

impl ConnectionSupervisor {
    /// Create the initial client, failing if it cannot be built.
    pub fn connect(connector: Arc<dyn Connector>, settings: ConnectionSettings) -> Result<Self> {
        let client = connector.connect(&settings)?;
        info!(url = %settings.url, "InfluxDB client created");

        Ok(Self {
            connector,
            settings,
            client,
            reconnects: 0,
        })
    }

    /// The current client.
    pub fn client(&self) -> &dyn StoreClient {
        self.client.as_ref()
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    /// Number of successful rebuilds so far.
    pub fn reconnects(&self) -> u64 {
        self.reconnects
    }

    /// Replace the client with a freshly built one.
    ///
    /// On failure the previous client is kept so there is always a handle
    /// to try again with.
    pub fn rebuild(&mut self) -> Result<()> {
        let client = self.connector.connect(&self.settings)?;
        self.client = client;
        self.reconnects += 1;
        info!(url = %self.settings.url, reconnects = self.reconnects, "InfluxDB client recreated");
        Ok(())
    }

    /// Ping the store and rebuild the client when the ping fails.
    pub async fn check(&mut self) -> Result<HealthCheck> {
        match self.client.ping().await {
            Ok(pong) => Ok(HealthCheck::Healthy(pong)),
            Err(cause) => {
                warn!(error = %cause, "Got error while sending a ping to InfluxDB, trying to recreate client");
                match self.rebuild() {
                    Ok(()) => Ok(HealthCheck::Reconnected { cause }),
                    Err(e) => Err(ReporterError::Reconnect {
                        ping: cause.to_string(),
                        connect: e.to_string(),
                    }),
                }
            }
        }
    }
}
