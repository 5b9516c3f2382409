//! Helper configuration.
use crate::{service::PairingPolicy, Error, Result};
use serde::{Deserialize, Serialize};
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::Path,
};

/// Default limit for request bodies.
const BODY_LIMIT: usize = 1024 * 1024;

/// Configuration for a helper server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HelperConfig {
    /// Name of the helper, bound into pairing acceptances.
    pub name: String,

    /// Bind address for the server.
    pub bind: SocketAddr,

    /// Policy for pairing requests.
    pub policy: PairingPolicy,

    /// Maximum size of a request body in bytes.
    pub body_limit: usize,
}

impl Default for HelperConfig {
    fn default() -> Self {
        Self {
            name: "helper".to_owned(),
            bind: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)), 5053),
            policy: Default::default(),
            body_limit: BODY_LIMIT,
        }
    }
}

impl HelperConfig {
    /// Load a helper config from a TOML file.
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
}
