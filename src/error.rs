//! Error types for kea-dns.

use thiserror::Error;

/// Errors that can occur in the DNS server.
#[derive(Debug, Error)]
pub enum DnsError {
    /// IO error (socket bind, network)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Lease database error
    #[error("lease database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Lease query exceeded its time budget
    #[error("lease query timed out")]
    QueryTimeout,

    /// DNS protocol error
    #[error("DNS protocol error: {0}")]
    Proto(#[from] hickory_proto::ProtoError),
}
