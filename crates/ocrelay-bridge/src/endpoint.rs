//! Host/port resolution for the backend process.

use std::fmt;

use reqwest::Url;

use ocrelay_core::config::DEFAULT_HOST;

/// Where the backend listens, as derived from the configured base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    /// Resolve the listening host and port from `base_url`.
    ///
    /// A URL without an explicit port reports its scheme's well-known port
    /// (80/443); that means "unset", so `default_port` is used instead. An
    /// unparsable URL falls back to the default host and port.
    pub fn resolve(base_url: &str, default_port: u16) -> Self {
        let Ok(url) = Url::parse(base_url) else {
            return Self {
                host: DEFAULT_HOST.to_string(),
                port: default_port,
            };
        };

        // IPv6 literals come back bracketed; sockets want them bare.
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .map_or_else(
                || DEFAULT_HOST.to_string(),
                |h| h.trim_start_matches('[').trim_end_matches(']').to_string(),
            );
        let port = match url.port_or_known_default() {
            Some(80 | 443) | None => default_port,
            Some(port) => port,
        };
        Self { host, port }
    }

    /// Same host, different port.
    #[must_use]
    pub fn with_port(&self, port: u16) -> Self {
        Self {
            host: self.host.clone(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
