mod commands;
mod engine;
mod gateway;

#[cfg(test)]
mod testing;

use anifeed_anilist::AniListClient;
use anifeed_channels::telegram::TelegramChannel;
use anifeed_core::{
    activity::MediaFilter,
    config::{self, Config},
    shellexpand,
    traits::{ActivitySource, Channel},
};
use anifeed_store::Store;
use clap::{Parser, Subcommand};
use engine::{Engine, EngineSettings};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(
    name = "anifeed",
    version,
    about = "AniList activity feed relay for Telegram chats"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot: command intake plus periodic activity sweeps.
    Start,
    /// Show configuration, database size, and subscription count.
    Status,
    /// Resolve a user and print their most recent activity. Nothing is stored.
    Check {
        /// AniList username.
        handle: String,
        /// Which activity to show: both, anime, or manga.
        #[arg(short, long, default_value = "both")]
        filter: MediaFilter,
        /// How many entries to print.
        #[arg(short, long, default_value_t = 5)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli.config)?;
    let _log_guard = init_tracing(&cfg)?;

    match cli.command {
        Commands::Start => {
            let tg = match cfg.channel.telegram {
                Some(ref tg) if tg.enabled => tg.clone(),
                _ => anyhow::bail!(
                    "Telegram is not enabled. Enable [channel.telegram] in config.toml \
                     or set TELEGRAM_BOT_TOKEN."
                ),
            };
            if tg.bot_token.is_empty() {
                anyhow::bail!(
                    "Telegram is enabled but bot_token is empty. \
                     Set it in config.toml or TELEGRAM_BOT_TOKEN env var."
                );
            }

            let store = Store::new(&cfg.store).await?;
            let source: Arc<dyn ActivitySource> = Arc::new(AniListClient::from_config(&cfg.anilist)?);
            let channel: Arc<dyn Channel> = Arc::new(TelegramChannel::new(tg));

            let settings = EngineSettings::from_config(&cfg.anilist, &cfg.scheduler);
            let engine = Arc::new(Engine::new(store, source, channel.clone(), settings));

            tracing::info!("{} starting", cfg.anifeed.name);
            let gw = Arc::new(gateway::Gateway::new(
                engine,
                channel,
                cfg.scheduler.clone(),
            ));
            gw.run().await?;
        }
        Commands::Status => {
            println!("anifeed status\n");
            println!("Config: {}", cli.config);
            println!("Database: {}", shellexpand(&cfg.store.db_path));
            println!("AniList endpoint: {}", cfg.anilist.base_url);
            println!(
                "Sweep interval: {}s, max {} notifications per poll",
                cfg.scheduler.sweep_interval().as_secs(),
                cfg.scheduler.max_notifications_per_poll
            );
            println!();

            match Store::new(&cfg.store).await {
                Ok(store) => {
                    let size = store.db_size().await.unwrap_or(0);
                    let count = store.count_subscriptions().await.unwrap_or(0);
                    println!("  database: {} KiB, {count} subscriptions", size / 1024);
                    store.checkpoint_and_close().await;
                }
                Err(e) => println!("  database: unavailable ({e})"),
            }

            if let Some(ref tg) = cfg.channel.telegram {
                println!(
                    "  telegram: {}",
                    if tg.enabled && !tg.bot_token.is_empty() {
                        "configured"
                    } else if tg.enabled {
                        "enabled but missing bot_token"
                    } else {
                        "disabled"
                    }
                );
            } else {
                println!("  telegram: not configured");
            }
        }
        Commands::Check {
            handle,
            filter,
            limit,
        } => {
            let client = AniListClient::from_config(&cfg.anilist)?;
            let account_id = client.resolve_account(&handle).await?;
            println!("{handle}: account {account_id}");

            match client.fetch_profile(account_id).await {
                Ok(profile) => println!(
                    "  color {}, title language {}",
                    profile.accent_color.as_deref().unwrap_or("default"),
                    profile
                        .title_language
                        .map(|l| l.as_str())
                        .unwrap_or("default")
                ),
                Err(e) => println!("  profile unavailable: {e}"),
            }

            let mut entries = client
                .fetch_recent_activity(account_id, filter, limit.max(1))
                .await?;
            if entries.is_empty() {
                println!("  no list activity");
            }
            if let Err(e) = client.fetch_list_details(account_id, &mut entries).await {
                println!("  list details unavailable: {e}");
            }
            for entry in &entries {
                let progress = entry
                    .progress
                    .as_deref()
                    .map(|p| format!(" {p} of"))
                    .unwrap_or_default();
                println!(
                    "  #{} {} {}{progress} {}",
                    entry.id,
                    entry.created_at.format("%Y-%m-%d %H:%M"),
                    entry.status,
                    entry.title.resolve(None)
                );
            }
        }
    }

    Ok(())
}

/// Console logging filtered by RUST_LOG (falling back to the configured
/// level), plus an optional daily log file under `{data_dir}/logs/`.
fn init_tracing(cfg: &Config) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.anifeed.log_level));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer());

    if !cfg.anifeed.log_to_file {
        registry.init();
        return Ok(None);
    }

    let log_dir = PathBuf::from(shellexpand(&cfg.anifeed.data_dir)).join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let file_appender = tracing_appender::rolling::daily(&log_dir, "anifeed.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    registry
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .init();
    Ok(Some(guard))
}
