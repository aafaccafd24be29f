use clap::Subcommand;
use serde_json::json;

use crate::cli::config::{load_server_config, ping_server, save_server_config, ServerInfo, ServerStatus};
use crate::cli::utils::output_success;
use crate::cli::{Context, OutputFormat};

#[derive(Subcommand)]
pub enum ServerCommands {
    #[command(about = "Select the server used by later commands")]
    Use {
        #[arg(help = "Server URL, e.g. http://localhost:3000")]
        url: String,
    },

    #[command(about = "Show currently selected server")]
    Current,

    #[command(about = "Health check a server (defaults to current server)")]
    Ping {
        #[arg(help = "Server URL to ping")]
        url: Option<String>,
    },
}

pub async fn handle(cmd: ServerCommands, ctx: &Context) -> anyhow::Result<()> {
    match cmd {
        ServerCommands::Use { url } => {
            let mut config = load_server_config()?;
            let url = config.select(&url)?;
            save_server_config(&config)?;
            output_success(&ctx.output_format, &format!("Using server {}", url), Some(json!({ "url": url })))
        }
        ServerCommands::Current => {
            let url = ctx.server_url()?;
            let config = load_server_config()?;
            let info = config.servers.get(&url).cloned().unwrap_or_else(|| ServerInfo::new(url.clone()));

            match ctx.output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&info)?),
                OutputFormat::Text => {
                    println!("Server: {}", info.url);
                    println!("Status: {:?}", info.status);
                    if let Some(last_ping) = info.last_ping {
                        println!("Last ping: {}", last_ping.format("%Y-%m-%d %H:%M:%S UTC"));
                    }
                }
            }
            Ok(())
        }
        ServerCommands::Ping { url } => {
            let mut config = load_server_config()?;
            let url = config.resolve(url.as_deref().or(ctx.server_override.as_deref()))?;
            let status = ping_server(&url).await;

            if let Some(info) = config.servers.get_mut(&url) {
                info.update_ping(status);
                save_server_config(&config)?;
            }

            match status {
                ServerStatus::Up => output_success(
                    &ctx.output_format,
                    &format!("{} is up", url),
                    Some(json!({ "url": url, "status": status })),
                ),
                _ => anyhow::bail!("{} is not responding", url),
            }
        }
    }
}
