//! Public configuration for the HTTP transport.

use std::time::Duration;

/// Configuration for [`HttpTransport`](crate::HttpTransport).
///
/// No overall request timeout is applied. Stalled transfers are abandoned by
/// the download orchestrator's inactivity timer instead.
///
/// # Example
///
/// ```
/// use bundlecache_http::HttpTransportConfig;
/// use std::time::Duration;
///
/// let config = HttpTransportConfig::new()
///     .with_connect_timeout(Duration::from_secs(5))
///     .with_user_agent("my-game/2.1");
/// ```
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Timeout for establishing the TCP/TLS connection
    pub(crate) connect_timeout: Duration,
    /// User agent string for HTTP requests
    pub(crate) user_agent: String,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            user_agent: concat!("bundlecache-http/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpTransportConfig {
    /// Create a new configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connect timeout.
    ///
    /// Defaults to 10 seconds.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the user agent string for HTTP requests.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Connect timeout.
    pub const fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// User agent sent with every request.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HttpTransportConfig::default();
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert!(config.user_agent().starts_with("bundlecache-http/"));
    }

    #[test]
    fn test_builder_pattern() {
        let config = HttpTransportConfig::new()
            .with_connect_timeout(Duration::from_millis(250))
            .with_user_agent("custom/1.0");

        assert_eq!(config.connect_timeout(), Duration::from_millis(250));
        assert_eq!(config.user_agent(), "custom/1.0");
    }
}
