pub mod commands;
pub mod config;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::client::{ApiClient, AuthSession, CardCache, ClientError, SessionStore};

#[derive(Parser)]
#[command(name = "cardtrooper")]
#[command(about = "Cardtrooper CLI - keep your loyalty cards in the terminal")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(long, global = true, env = "CARDTROOPER_SERVER", help = "Server URL for this invocation")]
    pub server: Option<String>,

    #[arg(long, global = true, help = "Work from the local card cache without contacting the server")]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Remote server selection")]
    Server {
        #[command(subcommand)]
        cmd: commands::server::ServerCommands,
    },

    #[command(about = "Authentication and token management")]
    Auth {
        #[command(subcommand)]
        cmd: commands::auth::AuthCommands,
    },

    #[command(about = "Loyalty card management")]
    Cards {
        #[command(subcommand)]
        cmd: commands::cards::CardsCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Per-invocation settings shared by every command
#[derive(Debug, Clone)]
pub struct Context {
    pub output_format: OutputFormat,
    pub server_override: Option<String>,
    pub offline: bool,
}

impl Context {
    pub fn server_url(&self) -> anyhow::Result<String> {
        config::load_server_config()?.resolve(self.server_override.as_deref())
    }

    pub fn auth_session(&self) -> anyhow::Result<AuthSession> {
        let api = ApiClient::new(&self.server_url()?)?;
        let store = SessionStore::new(config::session_path()?);
        Ok(AuthSession::open(api, store)?)
    }

    pub fn card_cache(&self) -> anyhow::Result<CardCache> {
        Ok(CardCache::open(config::cache_path()?)?)
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let ctx = Context {
        output_format: OutputFormat::from_cli(&cli),
        server_override: cli.server,
        offline: cli.offline,
    };

    let result = match cli.command {
        Commands::Server { cmd } => commands::server::handle(cmd, &ctx).await,
        Commands::Auth { cmd } => commands::auth::handle(cmd, &ctx).await,
        Commands::Cards { cmd } => commands::cards::handle(cmd, &ctx).await,
    };

    // Text mode leaves error printing to the binary
    if let (Err(e), OutputFormat::Json) = (&result, &ctx.output_format) {
        utils::output_error(&ctx.output_format, &e.to_string(), error_code(e))?;
    }
    result
}

fn error_code(err: &anyhow::Error) -> Option<&'static str> {
    err.downcast_ref::<ClientError>().map(ClientError::code)
}
