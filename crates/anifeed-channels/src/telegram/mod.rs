//! Telegram Bot API channel.
//!
//! Uses long polling via `getUpdates` for commands, `sendMessage` for replies,
//! and `sendPhoto` for activity notifications.
//! Docs: <https://core.telegram.org/bots/api>

mod polling;
pub(crate) mod render;
pub(crate) mod send;
pub(crate) mod types;


use anifeed_core::config::TelegramConfig;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Telegram channel using the Bot API with long polling.
pub struct TelegramChannel {
    config: TelegramConfig,
    client: reqwest::Client,
    base_url: String,
    /// Tracks the last update_id to avoid reprocessing.
    last_update_id: Arc<Mutex<Option<i64>>>,
    /// Cleared by `stop()`; the polling task exits on its next iteration.
    running: Arc<AtomicBool>,
}

impl TelegramChannel {
    /// Create a new Telegram channel from config.
    pub fn new(config: TelegramConfig) -> Self {
        let base_url = format!("https://api.telegram.org/bot{}", config.bot_token);
        Self {
            config,
            client: reqwest::Client::new(),
            base_url,
            last_update_id: Arc::new(Mutex::new(None)),
            running: Arc::new(AtomicBool::new(false)),
        }
    }
}
