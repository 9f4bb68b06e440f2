use account_service::{AccountService, AccountServiceConfig};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Account Service CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Set the log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Commands
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the account service
    Start {
        /// Database URL
        #[arg(short, long)]
        database_url: Option<String>,

        /// Database pool size
        #[arg(short, long)]
        pool_size: Option<u32>,

        /// Bounded per-account lock wait in milliseconds
        #[arg(short = 'w', long)]
        lock_wait_ms: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "account_service={}",
            cli.log_level
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Start {
            database_url,
            pool_size,
            lock_wait_ms,
        } => {
            // Create config using provided values or env vars
            let mut config = match database_url {
                Some(url) => AccountServiceConfig::new(
                    url,
                    pool_size.unwrap_or(5),
                    lock_wait_ms.unwrap_or(account_service::config::DEFAULT_LOCK_WAIT_MS),
                ),
                None => AccountServiceConfig::from_env(),
            };
            if let Some(wait) = lock_wait_ms {
                config.lock_wait_ms = wait;
            }

            info!(
                "Starting account service with database pool size: {}, lock wait: {}ms",
                config.db_pool_size, config.lock_wait_ms
            );

            // Initialize service
            let _service = AccountService::with_config(&config).await?;

            // Wait for ctrl-c
            info!("Account service started. Press Ctrl+C to stop.");
            match signal::ctrl_c().await {
                Ok(()) => {
                    info!("Shutting down account service...");
                }
                Err(err) => {
                    error!("Error waiting for Ctrl+C: {}", err);
                }
            }
        }
    }

    Ok(())
}
