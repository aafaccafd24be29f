use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::{output_success, resolve_password};
use crate::cli::{Context, OutputFormat};
use crate::client::{AuthSession, Session};

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Login to server")]
    Login {
        #[arg(help = "Email address")]
        email: String,
        #[arg(long, env = "CARDTROOPER_PASSWORD", hide_env_values = true, help = "Password (will prompt if not provided)")]
        password: Option<String>,
    },

    #[command(about = "Logout from server and clear cached cards")]
    Logout,

    #[command(about = "Revoke every session of the current user")]
    LogoutAll,

    #[command(about = "Show current authentication status")]
    Status,

    #[command(about = "Refresh authentication token")]
    Refresh,

    #[command(about = "Show current user information")]
    Whoami,

    #[command(about = "Register new user and log in")]
    Register {
        #[arg(help = "Username")]
        username: String,
        #[arg(help = "Email")]
        email: String,
        #[arg(long, env = "CARDTROOPER_PASSWORD", hide_env_values = true, help = "Password (will prompt if not provided)")]
        password: Option<String>,
    },
}

pub async fn handle(cmd: AuthCommands, ctx: &Context) -> anyhow::Result<()> {
    let mut auth = ctx.auth_session()?;

    match cmd {
        AuthCommands::Login { email, password } => {
            let password = resolve_password(password)?;
            let session = auth.login(&email, &password).await?;
            let message = format!("Logged in as {}", session.user.username);
            output_success(&ctx.output_format, &message, Some(session_summary(session)))
        }
        AuthCommands::Register { username, email, password } => {
            let password = resolve_password(password)?;
            let session = auth.register(&username, &email, &password).await?;
            let message = format!("Registered and logged in as {}", session.user.username);
            output_success(&ctx.output_format, &message, Some(session_summary(session)))
        }
        AuthCommands::Logout => {
            auth.logout().await?;
            ctx.card_cache()?.clear()?;
            output_success(&ctx.output_format, "Logged out", None)
        }
        AuthCommands::LogoutAll => {
            let revoked = auth
                .authorized(|api, token| async move { api.logout_all(&token).await })
                .await?;
            auth.forget()?;
            ctx.card_cache()?.clear()?;
            output_success(
                &ctx.output_format,
                &format!("Revoked {} session(s)", revoked),
                Some(json!({ "revoked": revoked })),
            )
        }
        AuthCommands::Status => {
            print_status(&auth, &ctx.output_format)
        }
        AuthCommands::Refresh => {
            let session = auth.refresh().await?;
            let message = format!("Token refreshed, valid until {}", session.expires_at.format("%Y-%m-%d %H:%M:%S UTC"));
            output_success(&ctx.output_format, &message, Some(session_summary(session)))
        }
        AuthCommands::Whoami => {
            let user = auth
                .authorized(|api, token| async move { api.whoami(&token).await })
                .await?;

            match ctx.output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&user)?),
                OutputFormat::Text => {
                    println!("Username: {}", user.username);
                    println!("Email:    {}", user.email);
                    println!("User ID:  {}", user.id);
                    println!("Joined:   {}", user.created_at.format("%Y-%m-%d"));
                }
            }
            Ok(())
        }
    }
}

fn session_summary(session: &Session) -> serde_json::Value {
    json!({
        "server": session.server,
        "user": session.user,
        "expires_at": session.expires_at,
    })
}

fn print_status(auth: &AuthSession, output_format: &OutputFormat) -> anyhow::Result<()> {
    let server = auth.api().base_url();

    match (auth.session(), output_format) {
        (Some(session), OutputFormat::Json) => {
            let mut status = session_summary(session);
            status["authenticated"] = json!(true);
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        (None, OutputFormat::Json) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ "server": server, "authenticated": false }))?
            );
        }
        (Some(session), OutputFormat::Text) => {
            println!("Server:  {}", server);
            println!("User:    {} <{}>", session.user.username, session.user.email);
            println!("Expires: {}", session.expires_at.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        (None, OutputFormat::Text) => {
            println!("Server:  {}", server);
            println!("Not logged in");
        }
    }
    Ok(())
}
