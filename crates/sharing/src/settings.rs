//! Settings and configuration for sharers and secrets.
use crate::{Error, Result};
use custodia_fragments::MAX_FRAGMENTS;
use custodia_types::SecretId;
use custodia_wire::NetworkRetry;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use std::{path::Path, time::Duration};

/// Runtime settings for the sharing core.
#[derive(Debug, Clone)]
pub struct SharingSettings {
    /// Response timeout applied to every request.
    pub request_timeout: Duration,

    /// Interval between verification sweeps of the latest
    /// protected version, `None` disables the sweep.
    pub verify_interval: Option<Duration>,

    /// Retry policy for unpair requests.
    pub unpair_retry: NetworkRetry,
}

impl Default for SharingSettings {
    fn default() -> Self {
        Self {
            #[cfg(debug_assertions)]
            request_timeout: Duration::from_secs(2),
            #[cfg(not(debug_assertions))]
            request_timeout: Duration::from_secs(30),

            #[cfg(debug_assertions)]
            verify_interval: None,
            #[cfg(not(debug_assertions))]
            verify_interval: Some(Duration::from_secs(86400)),

            // Short backoff for test specs so they
            // execute fast.
            #[cfg(debug_assertions)]
            unpair_retry: NetworkRetry::new(2, 10),
            #[cfg(not(debug_assertions))]
            unpair_retry: NetworkRetry::default(),
        }
    }
}

impl SharingSettings {
    /// Create production settings.
    pub fn new() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            verify_interval: Some(Duration::from_secs(86400)),
            unpair_retry: NetworkRetry::default(),
        }
    }
}

/// Options for a new secret.
#[derive(Debug, Clone)]
pub struct SecretOptions {
    /// Secret identifier.
    pub id: SecretId,
    /// Description sent to helpers when pairing.
    pub description: String,
    /// Fragments required to recover a version and
    /// acknowledgements required to protect it.
    pub recovery_threshold: usize,
    /// Confirmed removals required to consider the secret
    /// deleted when it is closed.
    pub deletion_threshold: usize,
}

impl SecretOptions {
    /// Options with the deletion threshold equal to the
    /// recovery threshold.
    pub fn new(id: SecretId, recovery_threshold: usize) -> Self {
        Self {
            id,
            description: String::new(),
            recovery_threshold,
            deletion_threshold: recovery_threshold,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the deletion threshold.
    pub fn with_deletion_threshold(mut self, threshold: usize) -> Self {
        self.deletion_threshold = threshold;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.recovery_threshold == 0
            || self.recovery_threshold > MAX_FRAGMENTS
        {
            return Err(Error::InvalidThreshold(self.recovery_threshold));
        }
        if self.deletion_threshold > MAX_FRAGMENTS {
            return Err(Error::InvalidThreshold(self.deletion_threshold));
        }
        Ok(())
    }
}

/// Serializable sharer configuration.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SharerConfig {
    /// Name of the sharer presented to helpers.
    pub name: String,

    /// Response timeout in milliseconds.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub request_timeout: Duration,

    /// Verification interval in milliseconds.
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    pub verify_interval: Option<Duration>,

    /// Retry configuration for unpair requests.
    pub unpair_retry: RetryConfig,
}

/// Serializable retry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RetryConfig {
    /// Maximum number of retries.
    pub maximum_retries: u32,
    /// Base interval in milliseconds.
    pub reconnect_interval: u16,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let retry = NetworkRetry::default();
        Self {
            maximum_retries: retry.maximum_retries,
            reconnect_interval: retry.reconnect_interval,
        }
    }
}

impl Default for SharerConfig {
    fn default() -> Self {
        let settings = SharingSettings::new();
        Self {
            name: "sharer".to_owned(),
            request_timeout: settings.request_timeout,
            verify_interval: settings.verify_interval,
            unpair_retry: Default::default(),
        }
    }
}

impl SharerConfig {
    /// Create a config with production settings for a sharer name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Load a sharer config from a TOML file.
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !tokio::fs::try_exists(path).await? {
            return Err(Error::NotFile(path.to_path_buf()));
        }
        let contents = tokio::fs::read_to_string(path).await?;
        Ok(toml::from_str(&contents)?)
    }

    /// Encode this config as TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Runtime settings described by this config.
    pub fn settings(&self) -> SharingSettings {
        SharingSettings {
            request_timeout: self.request_timeout,
            verify_interval: self.verify_interval,
            unpair_retry: NetworkRetry::new(
                self.unpair_retry.maximum_retries,
                self.unpair_retry.reconnect_interval,
            ),
        }
    }
}
