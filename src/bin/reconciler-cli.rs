use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use haproxy_reconciler::config::load_config;
use haproxy_reconciler::deploy::BackupManager;
use haproxy_reconciler::inventory::{FileInventory, InventorySource};
use haproxy_reconciler::lifecycle::startup;
use haproxy_reconciler::registry::{classify, registry_from, Classification};
use haproxy_reconciler::render::Renderer;

#[derive(Parser)]
#[command(name = "reconciler-cli")]
#[command(about = "Offline tools for the HAProxy reconciler", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "reconciler.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the settings file
    Check,
    /// Show how every inventory record is classified
    Services {
        /// Inventory file (defaults to the one in settings)
        #[arg(long)]
        inventory: Option<PathBuf>,
    },
    /// Render the configuration for the current inventory to stdout
    Render {
        /// Inventory file (defaults to the one in settings)
        #[arg(long)]
        inventory: Option<PathBuf>,
    },
    /// List configuration backups, newest first
    Backups,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = load_config(&cli.config)?;

    match cli.command {
        Commands::Check => {
            println!("{}: ok", cli.config.display());
            println!("  template  {}", settings.paths.template_dir.join(&settings.paths.template_name).display());
            println!("  staging   {}", settings.paths.staging_file.display());
            println!("  active    {}", settings.paths.active_config.display());
            println!("  backups   {}", settings.paths.backup_dir.display());
            println!("  inventory {}", settings.inventory.path.display());
        }
        Commands::Services { inventory } => {
            let path = inventory.unwrap_or_else(|| settings.inventory.path.clone());
            let records = FileInventory::new(path, Duration::from_secs(1)).snapshot().await?;
            for record in &records {
                match classify(record) {
                    Classification::Eligible(service) => println!(
                        "{:<32} proxied   {}:{}",
                        record.name, service.external_address, service.exposed_port
                    ),
                    Classification::NotEligible(reason) => {
                        println!("{:<32} skipped   {:?}", record.name, reason)
                    }
                    Classification::Ambiguous(e) => println!("{:<32} error     {}", record.name, e),
                }
            }
        }
        Commands::Render { inventory } => {
            let path = inventory.unwrap_or_else(|| settings.inventory.path.clone());
            let records = FileInventory::new(path, Duration::from_secs(1)).snapshot().await?;

            let (registry, ambiguous) = registry_from(&records);
            for e in &ambiguous {
                eprintln!("warning: {}", e);
            }

            let output = startup::build_renderer(&settings).render(&registry.snapshot())?;
            print!("{}", output);
        }
        Commands::Backups => {
            let backups = BackupManager::new(&settings.paths.backup_dir).list()?;
            if backups.is_empty() {
                println!("no backups in {}", settings.paths.backup_dir.display());
            }
            for backup in backups {
                println!("{}  {}", backup.taken_at().format("%Y-%m-%d %H:%M:%S"), backup.path.display());
            }
        }
    }

    Ok(())
}
