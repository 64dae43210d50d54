//! Connection Profile - How to reach the columnar store
//!
//! Immutable once constructed and owned exclusively by the Job that created
//! it; never persisted beyond process memory.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ports that imply an encrypted transport by store convention.
const TLS_PORTS: [u16; 2] = [8443, 9440];

#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionProfile {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    /// Bearer credential (JWT or password token). Redacted from Debug output.
    pub token: String,
}

impl ConnectionProfile {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
        user: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            database: database.into(),
            user: user.into(),
            token: token.into(),
        }
    }

    /// Transport is selected by port convention: 8443/9440 are TLS endpoints.
    pub fn scheme(&self) -> &'static str {
        if TLS_PORTS.contains(&self.port) {
            "https"
        } else {
            "http"
        }
    }

    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme(), self.host, self.port)
    }
}

impl fmt::Debug for ConnectionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionProfile")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_by_port_convention() {
        let plain = ConnectionProfile::new("localhost", 8123, "default", "default", "");
        assert_eq!(plain.scheme(), "http");
        assert_eq!(plain.base_url(), "http://localhost:8123");

        let tls = ConnectionProfile::new("example.cloud", 8443, "default", "default", "");
        assert_eq!(tls.scheme(), "https");

        let native_tls = ConnectionProfile::new("example.cloud", 9440, "default", "default", "");
        assert_eq!(native_tls.scheme(), "https");
    }

    #[test]
    fn test_debug_redacts_token() {
        let profile = ConnectionProfile::new("localhost", 8123, "db", "user", "secret");
        let debug = format!("{:?}", profile);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("<redacted>"));
    }
}
