use clap::{Parser, Subcommand};
use notify_handlers::app::config_resolver::ConfigKind;
use notify_handlers::config::Settings;
use notify_handlers::domain::QueueEvent;
use notify_handlers::handlers::Handlers;
use notify_handlers::{logging, metrics};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "notify_handlers")]
#[command(about = "Test-result SMS notifications and install statistics")]
#[command(version = "0.1.0")]
struct Cli {
    /// Optional TOML file with handler settings
    #[arg(long, default_value = "notify.toml")]
    settings: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send SMS notifications for a queue event
    Sms {
        /// Event JSON, e.g. '{"Records":[{"body":"..."}]}'
        event: Option<String>,
    },
    /// Rebuild and publish the install statistics
    Stats,
    /// Create the database tables
    Migrate,
    /// Resolve one configuration bundle (sms, stats-bucket, database, interop)
    Config { kind: ConfigKind },
}

async fn run(cli: Cli) -> anyhow::Result<String> {
    let settings = Settings::load(&cli.settings)?;
    let handlers = Handlers::from_env(settings).await?;

    match cli.command {
        Commands::Sms { event } => {
            let event: QueueEvent = serde_json::from_str(event.as_deref().unwrap_or("{}"))?;
            info!(records = event.records.len(), "Running SMS handler");
            Ok(handlers.handle_sms(&event).await?.to_string())
        }
        Commands::Stats => {
            info!("Running stats handler");
            Ok(handlers.handle_stats().await?)
        }
        Commands::Migrate => {
            let db = handlers.connect_database().await?;
            db.run_migrations().await?;
            Ok("migrations applied".to_string())
        }
        Commands::Config { kind } => {
            let bundle = handlers.resolver().resolve(kind).await?;
            Ok(format!("{bundle:#?}"))
        }
    }
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let guard = logging::init_logging();
    metrics::init_metrics();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(result) => {
            println!("{result}");
        }
        Err(e) => {
            error!("Handler failed: {:#}", e);
            println!("{e:#}");
            drop(guard);
            std::process::exit(1);
        }
    }
}
