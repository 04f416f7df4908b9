mod cli;
mod commands;
mod config;
mod observability;
mod output;
mod store;

use anyhow::{Result, anyhow};
use clap::Parser;

use cli::{
    AuthorizationCommands, Cli, ClientCommands, Commands, ConfigCommands, ConsentCommands,
};
use output::print_error;

#[tokio::main]
async fn main() {
    // Load .env file if present; a missing file is not an error.
    if let Err(e) = dotenvy::dotenv()
        && !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
    {
        eprintln!("Warning: Failed to load .env file: {e}");
    }

    observability::init_tracing_with_level("warn");

    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut cfg = config::loader::load_config(cli.config.as_deref()).map_err(|e| anyhow!(e))?;
    if let Some(level) = &cli.log_level {
        cfg.logging.level = level.clone();
        cfg.validate().map_err(|e| anyhow!(e))?;
    }
    observability::apply_logging_level(&cfg.logging.level);

    match &cli.command {
        Commands::Migrate => commands::maintenance::migrate(&cfg).await?,
        Commands::Config(args) => match &args.command {
            ConfigCommands::Show => print!("{}", toml::to_string_pretty(&cfg.redacted())?),
        },
        Commands::PurgeExpired(args) => {
            let stores = store::open(&cfg, "purge-expired").await?;
            commands::maintenance::purge_expired(&stores, args.now.as_deref()).await?;
        }
        Commands::Client(args) => {
            let stores = store::open(&cfg, "client").await?;
            match &args.command {
                ClientCommands::Get { client_id } => {
                    commands::client::get(&stores, client_id).await?;
                }
                ClientCommands::Import { file } => {
                    commands::client::import(&stores, file.as_deref()).await?;
                }
                ClientCommands::Remove { id } => commands::client::remove(&stores, id).await?,
            }
        }
        Commands::Consent(args) => {
            let stores = store::open(&cfg, "consent").await?;
            match &args.command {
                ConsentCommands::List { principal } => {
                    commands::consent::list(&stores, principal).await?;
                }
                ConsentCommands::Revoke {
                    registered_client_id,
                    principal,
                } => commands::consent::revoke(&stores, registered_client_id, principal).await?,
            }
        }
        Commands::Authorization(args) => {
            let stores = store::open(&cfg, "authorization").await?;
            match &args.command {
                AuthorizationCommands::Find { token, kind } => {
                    commands::authorization::find(&stores, token, kind.as_deref()).await?;
                }
            }
        }
    }

    Ok(())
}
