//! Configuration types for kea-dns.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// DNS server configuration.
    pub dns: DnsConfig,

    /// Lease database configuration.
    pub database: DatabaseConfig,

    /// Telemetry configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// DNS server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsConfig {
    /// Address for the DNS server to listen on (UDP and TCP).
    pub listen_addr: SocketAddr,

    /// Domain suffix the server is authoritative for
    /// (e.g. "dhcp.example.com"). When unset the server answers for
    /// all names.
    #[serde(default)]
    pub authority_domain: Option<String>,
}

/// Lease database configuration.
///
/// Points at the DHCP server's lease table. Only read access is needed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database host.
    #[serde(default = "default_db_host")]
    pub host: String,

    /// Database port.
    #[serde(default = "default_db_port")]
    pub port: u16,

    /// Database user.
    pub user: String,

    /// Database password.
    #[serde(default)]
    pub password: String,

    /// Database name.
    pub database: String,

    /// Lease table name.
    #[serde(default = "default_lease_table")]
    pub table: String,

    /// Maximum number of pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Per-query timeout in milliseconds. A slow or wedged database
    /// fails the single query, never the whole server.
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
}

impl DatabaseConfig {
    /// Time budget applied to every lease-table round trip.
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level filter (e.g., "info", "debug", "kea_dns=debug,warn").
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Prometheus metrics exporter address.
    #[serde(default)]
    pub prometheus_addr: Option<SocketAddr>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            prometheus_addr: None,
        }
    }
}

fn default_db_host() -> String {
    "127.0.0.1".to_string()
}

fn default_db_port() -> u16 {
    3306
}

fn default_lease_table() -> String {
    "lease4".to_string()
}

fn default_max_connections() -> u32 {
    8
}

fn default_query_timeout_ms() -> u64 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}
