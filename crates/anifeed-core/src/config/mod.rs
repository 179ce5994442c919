mod channels;
mod defaults;


pub use channels::*;

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::AnifeedError;
use defaults::*;

/// Top-level anifeed configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub anifeed: AnifeedConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub anilist: AniListConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnifeedConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Also write a daily rolling log under `{data_dir}/logs/`.
    #[serde(default)]
    pub log_to_file: bool,
}

impl Default for AnifeedConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            log_to_file: false,
        }
    }
}

/// Subscription store config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

/// AniList GraphQL endpoint config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AniListConfig {
    #[serde(default = "default_anilist_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_anilist_timeout_secs")]
    pub timeout_secs: u64,
    /// Activity entries fetched per poll.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for AniListConfig {
    fn default() -> Self {
        Self {
            base_url: default_anilist_base_url(),
            timeout_secs: default_anilist_timeout_secs(),
            page_size: default_page_size(),
        }
    }
}

/// Polling scheduler config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// Most notifications delivered for one subscription in one poll.
    #[serde(default = "default_max_notifications")]
    pub max_notifications_per_poll: usize,
    #[serde(default = "default_profile_ttl_hours")]
    pub profile_ttl_hours: u64,
    #[serde(default = "default_max_concurrent_polls")]
    pub max_concurrent_polls: usize,
    /// How long shutdown waits for in-flight polls.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
    /// Upper bound on a single notification delivery.
    #[serde(default = "default_delivery_timeout_secs")]
    pub delivery_timeout_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sweep_interval_secs: default_sweep_interval_secs(),
            max_notifications_per_poll: default_max_notifications(),
            profile_ttl_hours: default_profile_ttl_hours(),
            max_concurrent_polls: default_max_concurrent_polls(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
            delivery_timeout_secs: default_delivery_timeout_secs(),
        }
    }
}

impl SchedulerConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    /// Saturates at the largest representable duration.
    pub fn profile_ttl(&self) -> chrono::Duration {
        i64::try_from(self.profile_ttl_hours)
            .ok()
            .and_then(chrono::Duration::try_hours)
            .unwrap_or(chrono::Duration::MAX)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery_timeout_secs.max(1))
    }
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist. An empty Telegram bot
/// token is filled from `TELEGRAM_BOT_TOKEN`.
pub fn load(path: &str) -> Result<Config, AnifeedError> {
    let path = Path::new(path);
    let mut config = if !path.exists() {
        tracing::info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        Config::default()
    } else {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AnifeedError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        parse(&content)?
    };

    config.channel.telegram = config.channel.telegram.take().map(TelegramConfig::with_env_token);
    if config.channel.telegram.is_none() {
        if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN") {
            config.channel.telegram = Some(TelegramConfig {
                enabled: true,
                bot_token: token,
                allowed_users: Vec::new(),
            });
        }
    }

    Ok(config)
}

/// Parse configuration from TOML text.
pub fn parse(content: &str) -> Result<Config, AnifeedError> {
    toml::from_str(content).map_err(|e| AnifeedError::Config(format!("failed to parse config: {e}")))
}
