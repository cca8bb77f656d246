use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bifrost::config::{AaaaMode, FakeConfig};
use bifrost::fake::FakeServer;

#[derive(Parser, Debug)]
#[command(
    name = "fakedns",
    version,
    about = "Authoritative DNS server for DNS64 load testing"
)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "/etc/fakedns.conf")]
    config: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fakedns=info,bifrost=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match FakeConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("fakedns-worker")
        .build()?;

    runtime.block_on(async_main(config))
}

async fn async_main(config: FakeConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting fakeDNS...");
    info!(
        "AAAA mode: {}",
        match config.aaaa_mode {
            AaaaMode::Yes => "1".to_string(),
            AaaaMode::No => "0".to_string(),
            AaaaMode::Probability(p) => format!("{}", p),
        }
    );
    info!("DNS64 prefix: {}", config.prefix);
    info!("Worker threads: {}, port: {}", config.num_threads, config.port);
    info!("Debug mode: {}", if config.debug { "yes" } else { "no" });

    let server = FakeServer::new(config);

    let signal_server = Arc::clone(&server);
    tokio::spawn(async move {
        let mut sigterm =
            signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
        info!("Shutdown signal received");
        signal_server.stop();
    });

    server.run().await.map_err(|e| {
        error!("{}", e);
        e
    })?;
    info!("Stopping fakeDNS...");
    Ok(())
}
