//! kea-dns - An authoritative DNS server backed by a Kea DHCP lease table.
//!
//! This crate provides a DNS server that answers forward (A) and reverse
//! (PTR) queries for dynamically leased addresses by reading the DHCP
//! server's lease table, so hosts get live resolution without any zone
//! file maintenance.
//!
//! ## Features
//!
//! - A records resolved from active leases by hostname, with the TTL
//!   derived from the remaining lease time
//! - PTR records resolved from active leases by address
//! - Optional authority-domain scoping, or catch-all operation
//! - Pooled, timeout-bounded lease-table access that degrades to a
//!   per-query failure instead of taking the server down
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                           kea-dns                              │
//! │                                                                │
//! │  ┌──────────────────┐     ┌──────────────────┐                 │
//! │  │   Lease Store    │◀────│  Lease Resolver  │                 │
//! │  │ (MySQL pool /    │     │ (normalize, TTL) │                 │
//! │  │  in-memory)      │     └────────▲─────────┘                 │
//! │  └──────────────────┘              │                           │
//! │           │                        │                           │
//! │           │ SELECT ... WHERE  ┌────┴─────────────┐             │
//! │           │ state = 0         │  Hickory DNS     │◀── UDP/TCP  │
//! │           ▼                   │  Server          │     :53     │
//! │    Kea lease4 table           └──────────────────┘             │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## DNS Resolution
//!
//! ```text
//! A?   host1.                      → lease rows with matching hostname
//!                                  → A records, ttl = expire - now
//! PTR? 1.0.168.192.in-addr.arpa.   → reversed octets → 192.168.0.1
//!                                  → PTR records with the hostname
//! ```
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use kea_dns::{DnsConfig, DnsServer, MemoryLeaseStore};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = DnsConfig {
//!         listen_addr: "0.0.0.0:53530".parse().unwrap(),
//!         authority_domain: Some("dhcp.example.com".to_string()),
//!     };
//!
//!     let shutdown = CancellationToken::new();
//!     let store = Arc::new(MemoryLeaseStore::new());
//!
//!     let server = DnsServer::new(config, store);
//!     server.run(shutdown).await.unwrap();
//! }
//! ```

#![warn(missing_docs)]

pub mod addr;
pub mod authority;
pub mod config;
pub mod error;
pub mod metrics;
pub mod resolver;
pub mod server;
pub mod store;
pub mod telemetry;

// Re-export main types
pub use config::{Config, DatabaseConfig, DnsConfig, TelemetryConfig};
pub use error::DnsError;
pub use resolver::{LeaseAnswer, LeaseResolver};
pub use server::DnsServer;
pub use store::{LeaseStore, MemoryLeaseStore, MySqlLeaseStore};
