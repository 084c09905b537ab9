//! Client configuration.

use std::time::Duration;

/// Connection settings for a [`StoreClient`](crate::StoreClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server host name or address.
    pub host: String,
    /// Server TCP port.
    pub port: u16,
    /// Timeout for establishing the TCP connection.
    pub connect_timeout: Duration,
    /// Timeout for a whole request, connect included.
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Settings for a server at the given host and port, default timeouts.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port, ..Self::default() }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8001,
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
        }
    }
}
