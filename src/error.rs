//! Reporter Errors

use thiserror::Error;

/// The reporter result type.
pub type Result<T> = std::result::Result<T, ReporterError>;

/// Errors surfaced by the reporter and its store client.
///
/// Every variant carries owned strings so errors can be cloned into the
/// optional error sink and compared in tests.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ReporterError {
    #[error("unable to parse InfluxDB url {url}, {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("unable to create InfluxDB client, {0}")]
    Connect(String),
    #[error("unable to write {points} points to database {database}, {message}")]
    Write {
        database: String,
        points: usize,
        status: Option<u16>,
        message: String,
    },
    #[error("ping to InfluxDB failed, {0}")]
    Ping(String),
    #[error("ping to InfluxDB failed ({ping}) and the client could not be recreated ({connect})")]
    Reconnect { ping: String, connect: String },
    #[error("invalid reporter configuration, {0}")]
    Config(String),
}

impl ReporterError {
    /// HTTP status returned by the store, if the error came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ReporterError::Write { status, .. } => *status,
            _ => None,
        }
    }
}
