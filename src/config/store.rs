//! Keyspaces store configuration.

use std::path::PathBuf;

use serde::Deserialize;

/// Default CQL-over-TLS port of the managed service.
pub const DEFAULT_PORT: u16 = 9142;
/// Public location of the Starfield Class 2 root certificate.
pub const DEFAULT_CERT_URL: &str = "https://certs.secureserver.net/repository/sf-class2-root.crt";

/// Store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Keyspace holding the product table.
    pub keyspace: String,
    /// Product table name.
    pub table: String,
    /// Contact point host. Defaults to `cassandra.<region>.amazonaws.com`.
    pub contact_point: Option<String>,
    /// Contact point port.
    pub port: u16,
    /// Directory where the root certificate is cached. Defaults to the OS temp dir.
    pub cert_dir: Option<PathBuf>,
    /// Where to fetch the root certificate from when it is not cached.
    pub cert_url: String,
    /// Share one driver session across requests instead of one per request.
    pub pooled: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            keyspace: "productsearch".to_string(),
            table: "product_by_item".to_string(),
            contact_point: None,
            port: DEFAULT_PORT,
            cert_dir: None,
            cert_url: DEFAULT_CERT_URL.to_string(),
            pooled: false,
        }
    }
}

impl StoreConfig {
    /// Host of the node to contact first. The server certificate must name it.
    pub fn contact_host_for(&self, region: &str) -> String {
        self.contact_point
            .clone()
            .unwrap_or_else(|| format!("cassandra.{}.amazonaws.com", region))
    }

    /// `host:port` of the node to contact first.
    pub fn contact_point_for(&self, region: &str) -> String {
        format!("{}:{}", self.contact_host_for(region), self.port)
    }

    pub fn cert_dir(&self) -> PathBuf {
        self.cert_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}
