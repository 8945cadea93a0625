//! Read-only access to the DHCP lease table.
//!
//! The resolver reaches the lease table through the [`LeaseStore`] trait:
//! two parameterized lookups plus lifecycle hooks. [`MySqlLeaseStore`]
//! talks to a Kea `lease4` table over a pooled connection;
//! [`MemoryLeaseStore`] carries the same matching semantics for tests and
//! embedded use.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use std::net::Ipv4Addr;
use std::time::Duration;
use tracing::debug;

use crate::addr;
use crate::config::DatabaseConfig;
use crate::error::DnsError;
use crate::metrics;

/// Lease row matched by hostname: the address it maps to and its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressLease {
    /// Leased address in network byte order.
    pub address: u32,
    /// Absolute lease expiry.
    pub expires_at: DateTime<Utc>,
}

/// Lease row matched by address: the hostname it maps to and its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostnameLease {
    /// Hostname the client registered with its lease.
    pub hostname: String,
    /// Absolute lease expiry.
    pub expires_at: DateTime<Utc>,
}

/// Read-only view of the DHCP lease table.
///
/// Implementations must be safe to share across concurrently running
/// resolutions. Failures surface as [`DnsError`] so callers can turn them
/// into a per-query response instead of tearing down the process.
#[async_trait]
pub trait LeaseStore: Send + Sync {
    /// Active leases whose hostname matches `name` case-insensitively.
    ///
    /// Both the dot-terminated question-name form and the stripped form
    /// match, since deployments differ on which one the DHCP server
    /// writes. Rows are ordered by descending expiry so the freshest
    /// lease sorts first.
    async fn find_by_hostname(&self, name: &str) -> Result<Vec<AddressLease>, DnsError>;

    /// Active leases bound to `address`, ordered by descending expiry.
    async fn find_by_address(&self, address: u32) -> Result<Vec<HostnameLease>, DnsError>;

    /// Verify the store is reachable. Called once before serving.
    async fn ping(&self) -> Result<(), DnsError>;

    /// Emit store health gauges. Called periodically by the server.
    fn emit_metrics(&self) {}

    /// Release underlying resources on shutdown.
    async fn close(&self) {}
}

/// Lease store backed by a Kea MySQL lease table.
pub struct MySqlLeaseStore {
    pool: MySqlPool,
    by_hostname_sql: String,
    by_address_sql: String,
    query_timeout: Duration,
}

impl MySqlLeaseStore {
    /// Open a connection pool against the configured database.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DnsError> {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database);

        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.query_timeout())
            .connect_with(options)
            .await?;

        Ok(Self::with_pool(pool, &config.table, config.query_timeout()))
    }

    /// Build a store over an existing pool.
    ///
    /// The table name comes from operator configuration and is the only
    /// text spliced into the statements; query values are always bound.
    pub fn with_pool(pool: MySqlPool, table: &str, query_timeout: Duration) -> Self {
        Self {
            by_hostname_sql: format!(
                "SELECT address, expire FROM {table} \
                 WHERE state = 0 AND UPPER(hostname) IN (?, ?) \
                 ORDER BY expire DESC"
            ),
            by_address_sql: format!(
                "SELECT hostname, expire FROM {table} \
                 WHERE state = 0 AND address = ? \
                 ORDER BY expire DESC"
            ),
            pool,
            query_timeout,
        }
    }
}

#[async_trait]
impl LeaseStore for MySqlLeaseStore {
    async fn find_by_hostname(&self, name: &str) -> Result<Vec<AddressLease>, DnsError> {
        let timer = metrics::Timer::start();
        let stripped = name.trim_end_matches('.');

        let query = sqlx::query_as::<_, (u32, DateTime<Utc>)>(&self.by_hostname_sql)
            .bind(name)
            .bind(stripped)
            .fetch_all(&self.pool);
        let rows = tokio::time::timeout(self.query_timeout, query)
            .await
            .map_err(|_| DnsError::QueryTimeout)??;

        metrics::record_store_query("by_hostname", timer.elapsed());
        Ok(rows
            .into_iter()
            .map(|(address, expires_at)| AddressLease {
                address,
                expires_at,
            })
            .collect())
    }

    async fn find_by_address(&self, address: u32) -> Result<Vec<HostnameLease>, DnsError> {
        let timer = metrics::Timer::start();

        let query = sqlx::query_as::<_, (String, DateTime<Utc>)>(&self.by_address_sql)
            .bind(address)
            .fetch_all(&self.pool);
        let rows = tokio::time::timeout(self.query_timeout, query)
            .await
            .map_err(|_| DnsError::QueryTimeout)??;

        metrics::record_store_query("by_address", timer.elapsed());
        Ok(rows
            .into_iter()
            .map(|(hostname, expires_at)| HostnameLease {
                hostname,
                expires_at,
            })
            .collect())
    }

    async fn ping(&self) -> Result<(), DnsError> {
        let query = sqlx::query("SELECT 1").execute(&self.pool);
        tokio::time::timeout(self.query_timeout, query)
            .await
            .map_err(|_| DnsError::QueryTimeout)??;
        Ok(())
    }

    fn emit_metrics(&self) {
        metrics::record_pool_state(self.pool.size() as usize, self.pool.num_idle());
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Kea lease states. Only active rows are eligible for resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseState {
    /// State 0: currently assigned.
    Active,
    /// State 1: declined by the client.
    Declined,
    /// State 2: expired and reclaimed by the server.
    ExpiredReclaimed,
}

/// A single lease row.
#[derive(Debug, Clone)]
pub struct LeaseEntry {
    /// Leased address in network byte order.
    pub address: u32,
    /// Hostname the client registered, matched case-insensitively.
    pub hostname: String,
    /// Absolute lease expiry.
    pub expires_at: DateTime<Utc>,
    /// Lease state.
    pub state: LeaseState,
}

impl LeaseEntry {
    /// Build a lease row.
    pub fn new(
        hostname: impl Into<String>,
        ip: Ipv4Addr,
        expires_at: DateTime<Utc>,
        state: LeaseState,
    ) -> Self {
        Self {
            address: addr::from_ipv4(ip),
            hostname: hostname.into(),
            expires_at,
            state,
        }
    }

    /// Build an active lease row.
    pub fn active(hostname: impl Into<String>, ip: Ipv4Addr, expires_at: DateTime<Utc>) -> Self {
        Self::new(hostname, ip, expires_at, LeaseState::Active)
    }
}

/// In-memory lease store with the same matching and ordering semantics
/// as the SQL store. Backs unit and integration tests.
#[derive(Debug, Default)]
pub struct MemoryLeaseStore {
    leases: RwLock<Vec<LeaseEntry>>,
}

impl MemoryLeaseStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a lease row.
    pub fn insert(&self, entry: LeaseEntry) {
        debug!(hostname = %entry.hostname, address = entry.address, "inserting lease");
        self.leases.write().push(entry);
    }
}

#[async_trait]
impl LeaseStore for MemoryLeaseStore {
    async fn find_by_hostname(&self, name: &str) -> Result<Vec<AddressLease>, DnsError> {
        let stripped = name.trim_end_matches('.');
        let mut rows: Vec<AddressLease> = self
            .leases
            .read()
            .iter()
            .filter(|lease| lease.state == LeaseState::Active)
            .filter(|lease| {
                lease.hostname.eq_ignore_ascii_case(name)
                    || lease.hostname.eq_ignore_ascii_case(stripped)
            })
            .map(|lease| AddressLease {
                address: lease.address,
                expires_at: lease.expires_at,
            })
            .collect();
        rows.sort_by(|a, b| b.expires_at.cmp(&a.expires_at));
        Ok(rows)
    }

    async fn find_by_address(&self, address: u32) -> Result<Vec<HostnameLease>, DnsError> {
        let mut rows: Vec<HostnameLease> = self
            .leases
            .read()
            .iter()
            .filter(|lease| lease.state == LeaseState::Active && lease.address == address)
            .map(|lease| HostnameLease {
                hostname: lease.hostname.clone(),
                expires_at: lease.expires_at,
            })
            .collect();
        rows.sort_by(|a, b| b.expires_at.cmp(&a.expires_at));
        Ok(rows)
    }

    async fn ping(&self) -> Result<(), DnsError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn ip(s: &str) -> Ipv4Addr {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_find_by_hostname_is_case_insensitive() {
        let store = MemoryLeaseStore::new();
        store.insert(LeaseEntry::active("host1", ip("192.168.0.1"), Utc::now()));

        let rows = store.find_by_hostname("HOST1").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].address, 3232235521);
    }

    #[tokio::test]
    async fn test_find_by_hostname_matches_both_name_forms() {
        let store = MemoryLeaseStore::new();
        store.insert(LeaseEntry::active("host1", ip("192.168.0.1"), Utc::now()));
        store.insert(LeaseEntry::active("host2.", ip("192.168.0.2"), Utc::now()));

        // Stored without terminator, queried with one.
        assert_eq!(store.find_by_hostname("HOST1.").await.unwrap().len(), 1);
        // Stored with terminator, queried with one.
        assert_eq!(store.find_by_hostname("HOST2.").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_find_by_hostname_skips_non_active_rows() {
        let store = MemoryLeaseStore::new();
        let now = Utc::now();
        store.insert(LeaseEntry::new(
            "host1",
            ip("192.168.0.1"),
            now,
            LeaseState::Declined,
        ));
        store.insert(LeaseEntry::new(
            "host1",
            ip("192.168.0.2"),
            now,
            LeaseState::ExpiredReclaimed,
        ));

        assert!(store.find_by_hostname("HOST1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_by_hostname_orders_by_descending_expiry() {
        let store = MemoryLeaseStore::new();
        let now = Utc::now();
        store.insert(LeaseEntry::active(
            "host1",
            ip("192.168.0.1"),
            now + ChronoDuration::seconds(600),
        ));
        store.insert(LeaseEntry::active(
            "host1",
            ip("192.168.0.2"),
            now + ChronoDuration::seconds(3600),
        ));

        let rows = store.find_by_hostname("HOST1").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].address, addr::from_ipv4(ip("192.168.0.2")));
        assert_eq!(rows[1].address, addr::from_ipv4(ip("192.168.0.1")));
    }

    #[tokio::test]
    async fn test_find_by_address_returns_hostnames() {
        let store = MemoryLeaseStore::new();
        store.insert(LeaseEntry::active("host1", ip("192.168.0.1"), Utc::now()));
        store.insert(LeaseEntry::active("other", ip("10.0.0.1"), Utc::now()));

        let rows = store.find_by_address(3232235521).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].hostname, "host1");
    }
}
