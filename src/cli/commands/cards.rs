use std::path::PathBuf;

use clap::Subcommand;
use serde_json::json;

use crate::cards::codes::{render_payload_svg, render_payload_terminal, Symbology};
use crate::cards::{matches_search, sanitize_barcode_number, CardInput};
use crate::cli::utils::{confirm, output_empty_collection, output_success};
use crate::cli::{Context, OutputFormat};
use crate::client::{AuthSession, CachedCard, CardCache, ClientError};

#[derive(Subcommand)]
pub enum CardsCommands {
    #[command(about = "List cards, oldest first")]
    List {
        #[arg(long, short, help = "Only cards whose store name contains this text")]
        search: Option<String>,
    },

    #[command(about = "Add a card")]
    Add {
        #[arg(help = "Store name")]
        store: String,
        #[arg(help = "Card number or QR payload")]
        number: String,
        #[arg(long, help = "Card color as #rrggbb")]
        color: Option<String>,
        #[arg(long, help = "Render as a QR code instead of a CODE128 barcode")]
        qr: bool,
        #[arg(long, help = "Keep the barcode number exactly as typed")]
        raw: bool,
    },

    #[command(about = "Delete a card")]
    Delete {
        #[arg(help = "Card id, id prefix, or store name")]
        id: String,
        #[arg(long, short, help = "Skip confirmation")]
        yes: bool,
    },

    #[command(about = "Show a card with its scannable code")]
    Show {
        #[arg(help = "Card id, id prefix, or store name")]
        id: String,
        #[arg(long, help = "Also write the code as SVG to this file")]
        svg: Option<PathBuf>,
    },

    #[command(about = "Upload cards added offline and apply queued deletions")]
    Sync,
}

pub async fn handle(cmd: CardsCommands, ctx: &Context) -> anyhow::Result<()> {
    let mut auth = ctx.auth_session()?;
    let mut cache = open_scoped_cache(ctx, &auth)?;

    match cmd {
        CardsCommands::List { search } => {
            let loaded = cache.load(&mut auth, ctx.offline).await?;
            let query = search.unwrap_or_default();
            let mut cards: Vec<CachedCard> = loaded
                .cards
                .into_iter()
                .filter(|c| matches_search(&c.store_name, &query))
                .collect();
            cards.sort_by_key(|c| c.created_at);

            if cards.is_empty() {
                return output_empty_collection(&ctx.output_format, "cards", "No cards found");
            }

            match ctx.output_format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&json!({ "cards": cards, "offline": loaded.offline }))?
                    );
                }
                OutputFormat::Text => {
                    if loaded.offline {
                        println!("(offline, showing cached cards)");
                    }
                    println!("{:<10} {:<24} {:<8} {}", "ID", "STORE", "TYPE", "NUMBER");
                    for card in &cards {
                        let marker = if card.offline { " *" } else { "" };
                        println!(
                            "{:<10} {:<24} {:<8} {}{}",
                            short_id(card),
                            card.store_name,
                            Symbology::from_flag(card.is_qr_code).as_str(),
                            card.card_number,
                            marker
                        );
                    }
                    if cards.iter().any(|c| c.offline) {
                        println!("* not yet synced");
                    }
                }
            }
            Ok(())
        }
        CardsCommands::Add { store, number, color, qr, raw } => {
            let card_number = if qr || raw { number } else { sanitize_barcode_number(&number) };
            let input = CardInput {
                store_name: store,
                card_number,
                color,
                is_qr_code: qr,
            };

            let card = cache.add(&mut auth, input, ctx.offline).await?;
            let message = if card.offline {
                format!("Saved {} offline; run `cardtrooper cards sync` when connected", card.store_name)
            } else {
                format!("Added {}", card.store_name)
            };
            output_success(&ctx.output_format, &message, Some(serde_json::to_value(&card)?))
        }
        CardsCommands::Delete { id, yes } => {
            let card = find_card(&mut cache, &mut auth, &id, ctx.offline).await?;
            if !yes && !confirm(&format!("Delete {} ({})?", card.store_name, short_id(&card)))? {
                return output_success(&ctx.output_format, "Cancelled", None);
            }

            let deleted = cache.delete(&mut auth, card.id, ctx.offline).await?;
            let message = if deleted {
                format!("Deleted {}", card.store_name)
            } else {
                format!("Deleted {} locally; the server copy goes on next sync", card.store_name)
            };
            output_success(
                &ctx.output_format,
                &message,
                Some(json!({ "id": card.id, "queued": !deleted })),
            )
        }
        CardsCommands::Show { id, svg } => {
            let card = find_card(&mut cache, &mut auth, &id, ctx.offline).await?;
            let symbology = Symbology::from_flag(card.is_qr_code);

            if let Some(path) = &svg {
                std::fs::write(path, render_payload_svg(&card.card_number, symbology)?)?;
            }

            match ctx.output_format {
                OutputFormat::Json => {
                    let mut value = serde_json::to_value(&card)?;
                    value["symbology"] = json!(symbology);
                    println!("{}", serde_json::to_string_pretty(&value)?);
                }
                OutputFormat::Text => {
                    println!("{} ({})", card.store_name, card.color);
                    println!();
                    println!("{}", render_payload_terminal(&card.card_number, symbology)?);
                    println!();
                    println!("{}", card.card_number);
                    if let Some(path) = &svg {
                        println!("SVG written to {}", path.display());
                    }
                }
            }
            Ok(())
        }
        CardsCommands::Sync => {
            if ctx.offline {
                anyhow::bail!("cannot sync in offline mode");
            }
            let report = cache.sync(&mut auth).await?;
            let message = format!(
                "Synced: {} uploaded, {} deleted, {} cards on server",
                report.uploaded, report.deleted, report.total
            );
            if let OutputFormat::Text = ctx.output_format {
                for failure in &report.failed {
                    eprintln!("Could not upload {}", failure);
                }
            }
            output_success(&ctx.output_format, &message, Some(serde_json::to_value(&report)?))
        }
    }
}

fn open_scoped_cache(ctx: &Context, auth: &AuthSession) -> anyhow::Result<CardCache> {
    let session = auth.session().ok_or(ClientError::NotLoggedIn)?;
    let mut cache = ctx.card_cache()?;
    cache.scope_to(&session.server, session.user.id)?;
    Ok(cache)
}

/// Look the card up in the cache, refreshing from the server once on a miss
async fn find_card(
    cache: &mut CardCache,
    auth: &mut AuthSession,
    needle: &str,
    offline: bool,
) -> anyhow::Result<CachedCard> {
    if let Some(card) = cache.resolve(needle) {
        return Ok(card.clone());
    }
    if !offline {
        cache.load(auth, false).await?;
        if let Some(card) = cache.resolve(needle) {
            return Ok(card.clone());
        }
    }
    anyhow::bail!("no card matches '{}'", needle)
}

fn short_id(card: &CachedCard) -> String {
    card.id.to_string()[..8].to_string()
}
