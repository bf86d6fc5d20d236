//! Public configuration for the service client.

use std::time::Duration;

/// Default port the export service listens on.
pub const DEFAULT_PORT: u16 = 40653;

/// Default host of the export service.
pub const DEFAULT_HOST: &str = "localhost";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for [`QceClient`](crate::QceClient).
///
/// # Example
///
/// ```
/// use qce_client::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::new()
///     .with_host("192.168.1.20")
///     .with_token("secret")
///     .with_timeout(Duration::from_secs(10));
/// assert_eq!(config.base_url(), "http://192.168.1.20:40653");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    /// Bearer credential sent with every request.
    pub token: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            token: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("qce-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `http://host:port` without a trailing slash.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url(), "http://localhost:40653");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.token.is_none());
    }

    #[test]
    fn test_builder_chain() {
        let config = ClientConfig::new().with_port(8080).with_token("abc");
        assert_eq!(config.port, 8080);
        assert_eq!(config.token.as_deref(), Some("abc"));
    }
}
