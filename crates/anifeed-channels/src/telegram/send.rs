//! Outbound Bot API calls: text replies, photo notifications, command menu.

use super::render::{split_message, MESSAGE_LIMIT};
use super::types::TgResponse;
use super::TelegramChannel;
use anifeed_core::error::AnifeedError;
use tracing::{debug, info, warn};

impl TelegramChannel {
    /// Send a text message, split into Telegram-sized chunks.
    ///
    /// `html` selects Telegram's HTML parse mode; plain replies go out as-is.
    pub(crate) async fn send_text(
        &self,
        chat_id: &str,
        text: &str,
        html: bool,
    ) -> Result<(), AnifeedError> {
        for chunk in split_message(text, MESSAGE_LIMIT) {
            let mut body = serde_json::json!({
                "chat_id": chat_id,
                "text": chunk,
                "disable_web_page_preview": true,
            });
            if html {
                body["parse_mode"] = serde_json::Value::from("HTML");
            }
            self.call("sendMessage", &body).await?;
        }
        Ok(())
    }

    /// Send a photo by URL with an HTML caption.
    pub(crate) async fn send_photo_url(
        &self,
        chat_id: &str,
        photo_url: &str,
        caption: &str,
    ) -> Result<(), AnifeedError> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "photo": photo_url,
            "caption": caption,
            "parse_mode": "HTML",
        });
        self.call("sendPhoto", &body).await
    }

    /// POST a Bot API method and check the `ok` flag.
    ///
    /// Rate limiting (429) and other API errors become `AnifeedError::Channel`.
    async fn call(&self, method: &str, body: &serde_json::Value) -> Result<(), AnifeedError> {
        let url = format!("{}/{method}", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| AnifeedError::Channel(format!("telegram {method} failed: {e}")))?;

        let status = resp.status();
        let parsed: TgResponse<serde_json::Value> = resp.json().await.map_err(|e| {
            AnifeedError::Channel(format!("telegram {method} parse failed ({status}): {e}"))
        })?;

        if !parsed.ok {
            let description = parsed.description.unwrap_or_default();
            return Err(AnifeedError::Channel(format!(
                "telegram {method} got {status}: {description}"
            )));
        }
        debug!("telegram {method} ok");
        Ok(())
    }

    /// Register bot commands with Telegram so users see an autocomplete menu.
    /// Best-effort: logs failures but does not propagate errors.
    pub(crate) async fn register_commands(&self) {
        let commands = serde_json::json!({
            "commands": [
                { "command": "track", "description": "Track an AniList user here: /track <username> [both|anime|manga]" },
                { "command": "untrack", "description": "Stop tracking a user here: /untrack <username>" },
                { "command": "list", "description": "List users tracked in this chat" },
                { "command": "stats", "description": "Show AniList stats: /stats <username>" },
                { "command": "help", "description": "Show available commands" },
            ]
        });

        match self.call("setMyCommands", &commands).await {
            Ok(()) => info!("registered Telegram bot commands"),
            Err(e) => warn!("failed to register Telegram bot commands: {e}"),
        }
    }
}
