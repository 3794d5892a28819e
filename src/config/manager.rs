//! Configuration Manager

use super::ReporterConfig;
use crate::store::Precision;
use anyhow::{bail, Context, Result};
use std::path::Path;

/// Prefix of every environment variable read by [`ConfigManager::load_from_env`].
pub const ENV_PREFIX: &str = "INFLUXDB_REPORTER_";

/// Manages configuration loading and validation
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration from file
    ///
    /// `.yaml` and `.yml` files are read as YAML, anything else as TOML.
    /// A missing file yields the defaults.
    pub fn load_from_file(path: &Path) -> Result<ReporterConfig> {
        if !path.exists() {
            tracing::warn!("Configuration file not found at {}, using defaults", path.display());
            let config = ReporterConfig::default();
            config.validate()?;
            return Ok(config);
        }

        tracing::info!("Loading configuration from: {}", path.display());
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let is_yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml") | Some("yml")
        );
        let config: ReporterConfig = if is_yaml {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        };

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        tracing::info!("Configuration loaded and validated successfully");
        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn load_from_env() -> Result<ReporterConfig> {
        let mut config = ReporterConfig::default();
        config.apply_env(|key| std::env::var(format!("{}{}", ENV_PREFIX, key)).ok())?;
        config.validate()?;
        Ok(config)
    }
}

impl ReporterConfig {
    /// Override fields from variables resolved by `lookup`, which receives
    /// the variable name without [`ENV_PREFIX`].
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("URL") {
            self.url = url;
        }

        if let Some(database) = lookup("DATABASE") {
            self.database = database;
        }

        if let Some(username) = lookup("USERNAME") {
            self.username = username;
        }

        if let Some(password) = lookup("PASSWORD") {
            self.password = password;
        }

        if let Some(interval) = lookup("INTERVAL") {
            self.interval = humantime::parse_duration(&interval)
                .with_context(|| format!("Invalid {}INTERVAL: {}", ENV_PREFIX, interval))?;
        }

        if let Some(timeout) = lookup("TIMEOUT") {
            self.timeout = humantime::parse_duration(&timeout)
                .with_context(|| format!("Invalid {}TIMEOUT: {}", ENV_PREFIX, timeout))?;
        }

        if let Some(rp) = lookup("RETENTION_POLICY") {
            self.retention_policy = if rp.is_empty() { None } else { Some(rp) };
        }

        if let Some(precision) = lookup("PRECISION") {
            self.precision = precision
                .parse::<Precision>()
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("Invalid {}PRECISION: {}", ENV_PREFIX, precision))?;
        }

        if let Some(tags) = lookup("TAGS") {
            for pair in tags.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                let Some((key, value)) = pair.split_once('=') else {
                    bail!("Invalid {}TAGS entry '{}', expected key=value", ENV_PREFIX, pair);
                };
                self.tags.insert(key.trim().to_string(), value.trim().to_string());
            }
        }

        if let Some(flush) = lookup("FLUSH_ON_SHUTDOWN") {
            self.flush_on_shutdown = flush
                .parse::<bool>()
                .with_context(|| format!("Invalid {}FLUSH_ON_SHUTDOWN: {}", ENV_PREFIX, flush))?;
        }

        Ok(())
    }

    /// Validate the configuration
    ///
    /// The url itself is parsed when the reporter is built.
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            bail!("url must not be empty");
        }

        if self.database.trim().is_empty() {
            bail!("database must not be empty");
        }

        if self.interval.is_zero() {
            bail!("interval must be greater than 0");
        }

        if self.timeout.is_zero() {
            bail!("timeout must be greater than 0");
        }

        if self.username.is_empty() && !self.password.is_empty() {
            bail!("password is set but username is empty");
        }

        for (key, value) in &self.tags {
            if key.trim().is_empty() {
                bail!("tag with value '{}' has an empty name", value);
            }
        }

        Ok(())
    }
}
