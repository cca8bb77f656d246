use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bifrost::config::{DnsConfig, SelectionMode};
use bifrost::server::Server;

#[derive(Parser, Debug)]
#[command(name = "bifrost", version, about = "DNS64 translating resolver")]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "/etc/bifrost.conf")]
    config: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bifrost=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match DnsConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("bifrost-worker")
        .build()?;

    runtime.block_on(async_main(config))
}

async fn async_main(config: DnsConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting bifrost...");
    info!(
        "Nameservers: {}",
        config
            .nameservers
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    info!(
        "Selection mode: {}",
        match config.selection_mode {
            SelectionMode::RoundRobin => "round-robin",
            SelectionMode::Random => "random",
        }
    );
    info!("DNS64 prefix: {}", config.prefix);
    info!(
        "Timeout: {}.{:06}, resend attempts: {}",
        config.timeout.as_secs(),
        config.timeout.subsec_micros(),
        config.resend_attempts
    );
    info!(
        "Worker threads: {}, maximum response length: {}",
        config.num_threads, config.response_maxlength
    );
    info!("Debug mode: {}", if config.debug { "yes" } else { "no" });

    let server = Server::new(config).await.map_err(|e| {
        error!("{}", e);
        e
    })?;

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

    server.run().await?;
    info!("Stopping bifrost...");
    Ok(())
}
