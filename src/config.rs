//! Runtime configuration, read from environment variables.
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::compute::DEFAULT_COMPUTE_ENDPOINT;
use crate::metadata::DEFAULT_METADATA_HOST;

pub const METADATA_HOST_VAR: &str = "GCE_METADATA_HOST";
pub const COMPUTE_ENDPOINT_VAR: &str = "GCE_COMPUTE_ENDPOINT";
pub const ACCESS_TOKEN_VAR: &str = "GCE_ACCESS_TOKEN";
pub const REFRESH_INTERVAL_VAR: &str = "GCE_REFRESH_INTERVAL_SECS";
pub const LISTEN_ADDR_VAR: &str = "API_LISTEN_ADDR";

const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);
const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid value `{value}` for `{key}`: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub metadata_host: String,
    pub compute_endpoint: String,
    pub access_token: Option<String>,
    pub refresh_interval: Duration,
    pub listen_addr: SocketAddr,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("metadata_host", &self.metadata_host)
            .field("compute_endpoint", &self.compute_endpoint)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_interval", &self.refresh_interval)
            .field("listen_addr", &self.listen_addr)
            .finish()
    }
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`. Unset and blank variables take
    /// their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] naming the variable if the refresh
    /// interval is not a positive number of seconds or the listen address does
    /// not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let refresh_interval = match get(REFRESH_INTERVAL_VAR) {
            Some(value) => match u64::from_str(&value) {
                Ok(0) => return Err(invalid(REFRESH_INTERVAL_VAR, value, "must be positive")),
                Ok(secs) => Duration::from_secs(secs),
                Err(err) => return Err(invalid(REFRESH_INTERVAL_VAR, value, err)),
            },
            None => DEFAULT_REFRESH_INTERVAL,
        };

        let listen_addr = get(LISTEN_ADDR_VAR).unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_owned());
        let listen_addr = SocketAddr::from_str(&listen_addr)
            .map_err(|err| invalid(LISTEN_ADDR_VAR, listen_addr.clone(), err))?;

        Ok(Self {
            metadata_host: get(METADATA_HOST_VAR)
                .unwrap_or_else(|| DEFAULT_METADATA_HOST.to_owned()),
            compute_endpoint: get(COMPUTE_ENDPOINT_VAR)
                .unwrap_or_else(|| DEFAULT_COMPUTE_ENDPOINT.to_owned()),
            access_token: get(ACCESS_TOKEN_VAR),
            refresh_interval,
            listen_addr,
        })
    }
}

fn invalid(key: &'static str, value: String, reason: impl ToString) -> Error {
    Error::InvalidValue {
        key,
        value,
        reason: reason.to_string(),
    }
}
