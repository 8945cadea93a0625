//! kea-dns binary entry point.

use clap::Parser;
use kea_dns::{telemetry, Config, DnsServer, MySqlLeaseStore};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Authoritative DNS server answering from a Kea DHCP lease table.
#[derive(Parser, Debug)]
#[command(name = "kea-dns")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML).
    #[arg(short, long, default_value = "kea-dns.toml")]
    config: PathBuf,
}

/// Resolve once SIGINT or SIGTERM arrives.
#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = sigterm.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration
    let config: Config = config::Config::builder()
        .add_source(config::File::from(args.config.clone()))
        .add_source(
            config::Environment::with_prefix("KEA_DNS")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;

    // Initialize telemetry
    telemetry::init(&config.telemetry).map_err(|e| e as Box<dyn std::error::Error>)?;

    info!(
        config_file = %args.config.display(),
        listen_addr = %config.dns.listen_addr,
        database = %config.database.database,
        table = %config.database.table,
        "Starting kea-dns"
    );

    // Setup graceful shutdown
    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match shutdown_signal().await {
            Ok(()) => info!("Signal received, stopping"),
            Err(e) => error!("failed to listen for shutdown signals: {}", e),
        }
        signal_token.cancel();
    });

    // Open the lease store and run the DNS server
    let store = MySqlLeaseStore::connect(&config.database).await?;
    let server = DnsServer::new(config.dns, Arc::new(store));

    if let Err(e) = server.run(shutdown).await {
        error!("DNS server error: {}", e);
        return Err(e.into());
    }

    info!("kea-dns shutdown complete");
    Ok(())
}
