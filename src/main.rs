use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use haproxy_reconciler::config::load_config;
use haproxy_reconciler::inventory::InventorySource;
use haproxy_reconciler::lifecycle::{signals, startup, Shutdown};
use haproxy_reconciler::observability::{logging, metrics};
use haproxy_reconciler::ReconcileError;

#[derive(Parser)]
#[command(name = "haproxy-reconciler")]
#[command(about = "Keeps HAProxy configuration in sync with the cluster inventory", long_about = None)]
struct Args {
    /// Settings file (TOML).
    #[arg(short, long, default_value = "reconciler.toml")]
    config: PathBuf,

    /// Run the bootstrap cycle only, then exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let settings = match load_config(&args.config) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load settings from {}: {}", args.config.display(), e);
            return Err(e.into());
        }
    };

    logging::init_logging(&settings.observability)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "haproxy-reconciler starting");
    tracing::info!(
        template = ?settings.paths.template_dir.join(&settings.paths.template_name),
        staging = ?settings.paths.staging_file,
        active = ?settings.paths.active_config,
        backups = ?settings.paths.backup_dir,
        inventory = ?settings.inventory.path,
        "Settings loaded"
    );

    if settings.observability.metrics_enabled {
        match settings.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %settings.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let inventory = startup::build_inventory(&settings);
    let mut reconciler = startup::build_reconciler(&settings);

    let outcome = reconciler.bootstrap(&inventory).await?;
    tracing::info!(outcome = outcome.as_str(), "Bootstrap cycle finished");

    if args.once {
        return Ok(());
    }

    let events = inventory
        .watch(settings.reconcile.event_buffer)
        .map_err(ReconcileError::Stream)?;

    let shutdown = Shutdown::new();
    let shutdown_rx = shutdown.subscribe();
    tokio::spawn(async move {
        signals::wait_for_shutdown_signal().await;
        shutdown.trigger();
    });

    reconciler.run(events, shutdown_rx).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
