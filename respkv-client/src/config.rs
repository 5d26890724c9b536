//! Client configuration.
//!
//! Durations are written in milliseconds in JSON; omitted fields take their
//! defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};
use crate::pool::PoolConfig;

/// Configuration for the synchronous client and its pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Store address, e.g. "127.0.0.1:6379".
    pub addr: String,
    /// Maximum connections, idle plus leased.
    pub pool_size: usize,
    /// Connections dialed eagerly when the client is built.
    pub min_idle: usize,
    /// Maximum wait for a free connection.
    #[serde(with = "duration_ms")]
    pub borrow_timeout: Duration,
    #[serde(with = "duration_ms")]
    pub connect_timeout: Duration,
    #[serde(with = "duration_ms")]
    pub read_timeout: Duration,
    #[serde(with = "duration_ms")]
    pub write_timeout: Duration,
    /// Operations slower than this are reported as warnings.
    #[serde(with = "duration_ms")]
    pub slow_operation_threshold: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            addr: "127.0.0.1:6379".to_string(),
            pool_size: 16,
            min_idle: 0,
            borrow_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(10),
            slow_operation_threshold: Duration::from_millis(500),
        }
    }
}

impl ClientConfig {
    /// Parses a JSON document and validates it.
    pub fn from_json(json: &str) -> ClientResult<Self> {
        let config: ClientConfig =
            serde_json::from_str(json).map_err(|err| ClientError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ClientResult<()> {
        if self.addr.is_empty() {
            return Err(ClientError::Config("addr must not be empty".to_string()));
        }
        if self.pool_size == 0 {
            return Err(ClientError::Config("pool_size must be positive".to_string()));
        }
        if self.min_idle > self.pool_size {
            return Err(ClientError::Config(format!(
                "min_idle ({}) exceeds pool_size ({})",
                self.min_idle, self.pool_size
            )));
        }
        let timeouts = [
            ("borrow_timeout", self.borrow_timeout),
            ("connect_timeout", self.connect_timeout),
            ("read_timeout", self.read_timeout),
            ("write_timeout", self.write_timeout),
        ];
        // std refuses zero socket timeouts.
        for (name, value) in timeouts {
            if value.is_zero() {
                return Err(ClientError::Config(format!("{} must be positive", name)));
            }
        }
        Ok(())
    }

    pub(crate) fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            addr: self.addr.clone(),
            max_size: self.pool_size,
            borrow_timeout: self.borrow_timeout,
            connect_timeout: Some(self.connect_timeout),
            read_timeout: Some(self.read_timeout),
            write_timeout: Some(self.write_timeout),
        }
    }
}

/// Serde helper storing a `Duration` as whole milliseconds.
mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
