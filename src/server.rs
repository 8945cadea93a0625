//! DNS server setup and lifecycle management.

use hickory_server::authority::{AuthorityObject, Catalog};
use hickory_server::ServerFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, UdpSocket};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::addr::REVERSE_SUFFIX;
use crate::authority::LeaseAuthority;
use crate::config::DnsConfig;
use crate::error::DnsError;
use crate::resolver::LeaseResolver;
use crate::store::LeaseStore;

/// Timeout for idle TCP connections.
const TCP_TIMEOUT: Duration = Duration::from_secs(30);

/// Interval for emitting store health metrics.
const METRICS_INTERVAL: Duration = Duration::from_secs(10);

/// Periodically emit store metrics.
async fn metrics_loop(store: Arc<dyn LeaseStore>, shutdown: CancellationToken) {
    let mut interval = tokio::time::interval(METRICS_INTERVAL);

    loop {
        tokio::select! {
            _ = interval.tick() => store.emit_metrics(),
            _ = shutdown.cancelled() => {
                debug!("metrics loop shutting down");
                return;
            }
        }
    }
}

/// DNS server answering from an injected DHCP lease store.
pub struct DnsServer {
    config: DnsConfig,
    store: Arc<dyn LeaseStore>,
}

impl DnsServer {
    /// Create a new DNS server with the given configuration and store.
    pub fn new(config: DnsConfig, store: Arc<dyn LeaseStore>) -> Self {
        Self { config, store }
    }

    /// Build the catalog: a forward authority at the configured domain
    /// (or the root when none is set) and a reverse authority at
    /// `in-addr.arpa`, sharing one resolver.
    pub fn catalog(&self) -> Result<Catalog, DnsError> {
        let resolver = LeaseResolver::new(self.store.clone());

        let forward =
            LeaseAuthority::new(self.config.authority_domain.as_deref(), resolver.clone())?;
        let reverse = LeaseAuthority::new(Some(REVERSE_SUFFIX), resolver)?;

        let mut catalog = Catalog::new();
        for authority in [forward, reverse] {
            let authority: Arc<dyn AuthorityObject> = Arc::new(authority);
            catalog.upsert(authority.origin().clone(), vec![authority]);
        }

        Ok(catalog)
    }

    /// Run the DNS server until the shutdown token is cancelled.
    ///
    /// In-flight resolutions are allowed to complete; no new connections
    /// are accepted after cancellation.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), DnsError> {
        info!(
            listen_addr = %self.config.listen_addr,
            authority_domain = self.config.authority_domain.as_deref().unwrap_or("(all)"),
            "Starting kea-dns server"
        );

        // Fail startup on an unreachable database instead of serving
        // SERVFAIL for every query.
        self.store.ping().await?;
        info!("lease store reachable");

        let catalog = self.catalog()?;
        let mut server = ServerFuture::new(catalog);

        let udp_socket = UdpSocket::bind(self.config.listen_addr).await?;
        info!(addr = %self.config.listen_addr, "DNS UDP listening");
        server.register_socket(udp_socket);

        let tcp_listener = TcpListener::bind(self.config.listen_addr).await?;
        info!(addr = %self.config.listen_addr, "DNS TCP listening");
        server.register_listener(tcp_listener, TCP_TIMEOUT);

        info!("DNS server ready to serve queries");

        let loop_token = shutdown.child_token();
        let metrics_handle = tokio::spawn(metrics_loop(self.store.clone(), loop_token.clone()));
        self.store.emit_metrics();

        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("DNS server shutdown requested");
            }
            result = server.block_until_done() => {
                if let Err(e) = result {
                    error!("DNS server error: {}", e);
                }
            }
        }

        loop_token.cancel();
        let _ = metrics_handle.await;

        self.store.close().await;

        info!("DNS server stopped");
        Ok(())
    }
}
