use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "authstore")]
#[command(about = "authstore CLI - maintain an OAuth 2.0 authorization-state store")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path (defaults to ./authstore.toml when present)
    #[arg(short, long, global = true, env = "AUTHSTORE_CONFIG")]
    pub config: Option<String>,

    /// Log level override (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Apply the embedded database migrations
    Migrate,
    /// Delete authorizations whose tokens have all expired
    PurgeExpired(PurgeArgs),
    /// Manage registered clients
    Client(ClientArgs),
    /// Inspect and revoke consents
    Consent(ConsentArgs),
    /// Look up authorization records
    Authorization(AuthorizationArgs),
    /// Inspect CLI configuration
    Config(ConfigArgs),
}

#[derive(clap::Args)]
pub struct PurgeArgs {
    /// Reference instant in RFC 3339 (defaults to now)
    #[arg(long)]
    pub now: Option<String>,
}

#[derive(clap::Args)]
pub struct ClientArgs {
    #[command(subcommand)]
    pub command: ClientCommands,
}

#[derive(Subcommand)]
pub enum ClientCommands {
    /// Show a client by its public client_id
    Get {
        client_id: String,
    },
    /// Register or replace a client from a JSON file (reads stdin if omitted)
    Import {
        file: Option<String>,
    },
    /// Remove a client by its internal id
    Remove {
        id: String,
    },
}

#[derive(clap::Args)]
pub struct ConsentArgs {
    #[command(subcommand)]
    pub command: ConsentCommands,
}

#[derive(Subcommand)]
pub enum ConsentCommands {
    /// List every consent a principal has given
    List {
        principal: String,
    },
    /// Revoke the consent a principal gave to a client
    Revoke {
        registered_client_id: String,
        principal: String,
    },
}

#[derive(clap::Args)]
pub struct AuthorizationArgs {
    #[command(subcommand)]
    pub command: AuthorizationCommands,
}

#[derive(Subcommand)]
pub enum AuthorizationCommands {
    /// Find the authorization holding a token value
    Find {
        token: String,
        /// Token kind hint (state, code, access_token, refresh_token,
        /// id_token, user_code, device_code)
        #[arg(long)]
        kind: Option<String>,
    },
}

#[derive(clap::Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
}
