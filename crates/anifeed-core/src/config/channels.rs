use serde::{Deserialize, Serialize};

/// Channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChannelConfig {
    pub telegram: Option<TelegramConfig>,
}

/// Telegram bot config.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TelegramConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub bot_token: String,
    /// Telegram user ids allowed to issue commands. Empty = allow all.
    #[serde(default)]
    pub allowed_users: Vec<i64>,
}

impl TelegramConfig {
    /// Fill an empty bot token from `TELEGRAM_BOT_TOKEN`.
    pub fn with_env_token(mut self) -> Self {
        if self.bot_token.is_empty() {
            if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN") {
                self.bot_token = token;
            }
        }
        self
    }
}
