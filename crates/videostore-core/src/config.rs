//! Configuration module
//!
//! Client settings are read from the environment (after loading `.env`).
//! Timeouts are transport-level policy and stay unset unless configured.

use std::env;
use std::time::Duration;

use tonic::transport::Endpoint;

use crate::error::{Result, VideostoreError};
use crate::resource::ResourceName;

const DEFAULT_ADDRESS: &str = "http://localhost:8080";
/// Largest clip the server will return in a single message.
pub const MAX_MESSAGE_BYTES: usize = 1024 * 1024 * 32;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    pub address: String,
    pub resource: String,
    pub remote: Option<String>,
    pub connect_timeout: Option<Duration>,
    pub request_timeout: Option<Duration>,
    pub max_message_bytes: usize,
}

impl ClientConfig {
    pub fn new(address: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            resource: resource.into(),
            remote: None,
            connect_timeout: None,
            request_timeout: None,
            max_message_bytes: MAX_MESSAGE_BYTES,
        }
    }

    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Parse settings from any key lookup, e.g. a map in tests.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let address = lookup("VIDEOSTORE_ADDRESS").unwrap_or_else(|| DEFAULT_ADDRESS.to_string());

        let resource = lookup("VIDEOSTORE_RESOURCE").ok_or_else(|| {
            VideostoreError::Config("VIDEOSTORE_RESOURCE must be set".to_string())
        })?;

        let remote = lookup("VIDEOSTORE_REMOTE").filter(|r| !r.trim().is_empty());

        let connect_timeout = parse_secs(&lookup, "VIDEOSTORE_CONNECT_TIMEOUT_SECS")?;
        let request_timeout = parse_secs(&lookup, "VIDEOSTORE_REQUEST_TIMEOUT_SECS")?;

        let max_message_bytes = match lookup("VIDEOSTORE_MAX_MESSAGE_BYTES") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                VideostoreError::Config(
                    "VIDEOSTORE_MAX_MESSAGE_BYTES must be a valid number".to_string(),
                )
            })?,
            None => MAX_MESSAGE_BYTES,
        };

        let config = Self {
            address,
            resource,
            remote,
            connect_timeout,
            request_timeout,
            max_message_bytes,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.resource.trim().is_empty() {
            return Err(VideostoreError::Config(
                "VIDEOSTORE_RESOURCE must not be empty".to_string(),
            ));
        }

        if !(self.address.starts_with("http://") || self.address.starts_with("https://")) {
            return Err(VideostoreError::Config(format!(
                "VIDEOSTORE_ADDRESS must be an http:// or https:// URI, got '{}'",
                self.address
            )));
        }

        if self.max_message_bytes == 0 {
            return Err(VideostoreError::Config(
                "VIDEOSTORE_MAX_MESSAGE_BYTES must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Resource name as the host sees it (remote-prefixed when a remote is set).
    pub fn resource_name(&self) -> ResourceName {
        let name = ResourceName::videostore(self.resource.clone());
        match &self.remote {
            Some(remote) => name.prepend_remote(remote),
            None => name,
        }
    }

    /// Transport endpoint with the configured timeouts applied.
    pub fn endpoint(&self) -> Result<Endpoint> {
        let mut endpoint = Endpoint::from_shared(self.address.clone())?;
        if let Some(timeout) = self.connect_timeout {
            endpoint = endpoint.connect_timeout(timeout);
        }
        if let Some(timeout) = self.request_timeout {
            endpoint = endpoint.timeout(timeout);
        }
        Ok(endpoint)
    }
}

fn parse_secs<F>(lookup: &F, key: &str) -> Result<Option<Duration>>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| VideostoreError::Config(format!("{} must be a valid number", key)))
        })
        .transpose()
}
