//! Query-to-answer resolution over the lease store.
//!
//! One [`LeaseResolver`] handles every in-flight query: forward (A)
//! questions resolve the hostname against the lease table, reverse (PTR)
//! questions resolve the reversed address, and every other record type
//! deterministically yields no answers.

use chrono::{DateTime, Utc};
use hickory_proto::rr::RecordType;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::addr;
use crate::error::DnsError;
use crate::store::LeaseStore;

/// One DNS answer derived from a lease row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaseAnswer {
    /// Forward answer carrying the leased address.
    Address {
        /// Leased IPv4 address.
        addr: Ipv4Addr,
        /// Seconds until the lease expires, clamped at zero.
        ttl: u32,
    },
    /// Reverse answer carrying the hostname bound to the address.
    Pointer {
        /// Hostname with a trailing dot.
        hostname: String,
        /// Seconds until the lease expires, clamped at zero.
        ttl: u32,
    },
}

/// Seconds until `expires_at`, clamped at zero. Rows past their expiry
/// but still flagged active must answer with a zero TTL, never a
/// negative or wrapped one.
fn lease_ttl(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    expires_at
        .signed_duration_since(now)
        .num_seconds()
        .clamp(0, i64::from(u32::MAX)) as u32
}

/// Stateless lease resolution shared by every in-flight query.
///
/// Holds only the injected store handle; concurrent invocations share
/// nothing else.
#[derive(Clone)]
pub struct LeaseResolver {
    store: Arc<dyn LeaseStore>,
}

impl LeaseResolver {
    /// Create a resolver over the given store handle.
    pub fn new(store: Arc<dyn LeaseStore>) -> Self {
        Self { store }
    }

    /// Resolve one parsed query into zero or more answers.
    ///
    /// Returns the store's row order (freshest expiry first). An empty
    /// vector is the normal outcome for unknown names, malformed reverse
    /// names and unsupported record types; `Err` is reserved for store
    /// failures.
    pub async fn resolve(
        &self,
        rtype: RecordType,
        name: &str,
    ) -> Result<Vec<LeaseAnswer>, DnsError> {
        match rtype {
            RecordType::A => self.resolve_forward(name).await,
            RecordType::PTR => self.resolve_reverse(name).await,
            _ => {
                trace!(name, rtype = ?rtype, "unsupported record type");
                Ok(Vec::new())
            }
        }
    }

    async fn resolve_forward(&self, name: &str) -> Result<Vec<LeaseAnswer>, DnsError> {
        // Hostnames are stored case-insensitively; the store matches both
        // the terminated and the stripped form of the question name.
        let normalized = name.to_ascii_uppercase();
        let rows = self.store.find_by_hostname(&normalized).await?;
        let now = Utc::now();

        trace!(name = %normalized, rows = rows.len(), "forward lookup");
        Ok(rows
            .into_iter()
            .map(|row| LeaseAnswer::Address {
                addr: addr::to_ipv4(row.address),
                ttl: lease_ttl(row.expires_at, now),
            })
            .collect())
    }

    async fn resolve_reverse(&self, name: &str) -> Result<Vec<LeaseAnswer>, DnsError> {
        let Some(address) = addr::reverse_name_to_address(name) else {
            debug!(name, "not a well-formed reverse-lookup name");
            return Ok(Vec::new());
        };

        let rows = self.store.find_by_address(address).await?;
        let now = Utc::now();

        trace!(name, address, rows = rows.len(), "reverse lookup");
        Ok(rows
            .into_iter()
            .filter(|row| !row.hostname.is_empty())
            .map(|row| LeaseAnswer::Pointer {
                hostname: format!("{}.", row.hostname.trim_end_matches('.')),
                ttl: lease_ttl(row.expires_at, now),
            })
            .collect())
    }
}
