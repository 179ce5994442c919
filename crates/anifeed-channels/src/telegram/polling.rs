//! Long-polling update loop and Channel trait implementation.

use super::render::render_notification;
use super::types::{TgMessage, TgResponse, TgUpdate};
use super::TelegramChannel;
use anifeed_core::{
    activity::Notification,
    error::AnifeedError,
    message::{IncomingMessage, OutgoingMessage},
    traits::Channel,
};
use async_trait::async_trait;
use std::sync::atomic::Ordering;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<mpsc::Receiver<IncomingMessage>, AnifeedError> {
        self.register_commands().await;

        let (tx, rx) = mpsc::channel(64);
        let client = self.client.clone();
        let base_url = self.base_url.clone();
        let allowed_users = self.config.allowed_users.clone();
        let last_update_id = self.last_update_id.clone();
        let running = self.running.clone();
        running.store(true, Ordering::SeqCst);

        info!("Telegram channel starting long polling...");

        tokio::spawn(async move {
            let mut backoff_secs: u64 = 1;

            while running.load(Ordering::SeqCst) {
                let last = last_update_id.lock().await;
                let offset = last.map(|id| id + 1);
                drop(last);

                let mut url = format!("{base_url}/getUpdates?timeout=30&allowed_updates=[\"message\"]");
                if let Some(off) = offset {
                    url.push_str(&format!("&offset={off}"));
                }

                let resp = match client
                    .get(&url)
                    .timeout(std::time::Duration::from_secs(35))
                    .send()
                    .await
                {
                    Ok(r) => r,
                    Err(e) => {
                        error!("telegram poll error (retry in {backoff_secs}s): {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
                        backoff_secs = (backoff_secs * 2).min(60);
                        continue;
                    }
                };

                let body: TgResponse<Vec<TgUpdate>> = match resp.json().await {
                    Ok(b) => b,
                    Err(e) => {
                        error!("telegram parse error (retry in {backoff_secs}s): {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
                        backoff_secs = (backoff_secs * 2).min(60);
                        continue;
                    }
                };

                if !body.ok {
                    error!(
                        "telegram API error (retry in {backoff_secs}s): {}",
                        body.description.unwrap_or_default()
                    );
                    tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
                    backoff_secs = (backoff_secs * 2).min(60);
                    continue;
                }

                // Successful poll -- reset backoff.
                backoff_secs = 1;

                let updates = body.result.unwrap_or_default();

                if let Some(last_update) = updates.last() {
                    *last_update_id.lock().await = Some(last_update.update_id);
                }

                for update in updates {
                    let Some(msg) = update.message else {
                        continue;
                    };
                    let Some(incoming) = to_incoming(msg, &allowed_users) else {
                        continue;
                    };
                    if tx.send(incoming).await.is_err() {
                        info!("telegram channel receiver dropped, stopping poll");
                        return;
                    }
                }
            }
            info!("telegram polling loop exited");
        });

        Ok(rx)
    }

    async fn send(&self, message: OutgoingMessage) -> Result<(), AnifeedError> {
        let chat_id = message
            .reply_target
            .as_deref()
            .ok_or_else(|| AnifeedError::Channel("no reply_target on outgoing message".into()))?;
        self.send_text(chat_id, &message.text, false).await
    }

    async fn deliver(
        &self,
        target: &str,
        notification: &Notification,
    ) -> Result<(), AnifeedError> {
        let body = render_notification(notification);
        match &notification.artwork_url {
            Some(photo) => match self.send_photo_url(target, photo, &body).await {
                Ok(()) => Ok(()),
                Err(e) => {
                    // Telegram rejects some remote images; the text still carries the news.
                    debug!("sendPhoto failed for activity {}: {e}", notification.activity_id);
                    self.send_text(target, &body, true).await
                }
            },
            None => self.send_text(target, &body, true).await,
        }
    }

    async fn stop(&self) -> Result<(), AnifeedError> {
        self.running.store(false, Ordering::SeqCst);
        info!("Telegram channel stopped");
        Ok(())
    }
}

/// Turn a Telegram message into a command message, or `None` if it should be
/// ignored (not a command, no sender, or sender not allowed).
pub(crate) fn to_incoming(msg: TgMessage, allowed_users: &[i64]) -> Option<IncomingMessage> {
    let text = msg.text?;
    let trimmed = text.trim_start();
    if !(trimmed.starts_with('/') || trimmed.starts_with('!')) {
        return None;
    }

    let user = msg.from?;

    if !allowed_users.is_empty() && !allowed_users.contains(&user.id) {
        warn!("ignoring command from unauthorized user {}", user.id);
        return None;
    }

    let sender_name = if let Some(ref un) = user.username {
        format!("@{un}")
    } else if let Some(ref ln) = user.last_name {
        format!("{} {ln}", user.first_name)
    } else {
        user.first_name.clone()
    };

    Some(IncomingMessage {
        id: Uuid::new_v4(),
        channel: "telegram".to_string(),
        sender_id: user.id.to_string(),
        sender_name: Some(sender_name),
        text: trimmed.to_string(),
        timestamp: chrono::Utc::now(),
        reply_target: msg.chat.id.to_string(),
    })
}
