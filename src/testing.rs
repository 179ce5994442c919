//! In-process fakes for the activity source and the channel.

use crate::engine::{Engine, EngineSettings};
use anifeed_core::{
    activity::{
        AccountId, ActivityEntry, ActivityId, MediaFilter, MediaTitle, Notification,
        ProfileFields, UserStats,
    },
    config::StoreConfig,
    error::AnifeedError,
    message::{IncomingMessage, OutgoingMessage},
    traits::{ActivitySource, Channel},
};
use anifeed_store::Store;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Create a temporary on-disk store for testing (unique per call).
pub async fn test_store() -> Store {
    let id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!(
        "__anifeed_test_{}_{}__",
        std::process::id(),
        id
    ));
    let _ = std::fs::create_dir_all(&dir);
    let db_path = dir.join("test.db").to_string_lossy().to_string();
    let _ = std::fs::remove_file(&db_path);
    Store::new(&StoreConfig { db_path }).await.unwrap()
}

/// A list activity entry with a predictable title and timestamp.
pub fn entry(id: ActivityId) -> ActivityEntry {
    ActivityEntry {
        id,
        status: "watched episode".to_string(),
        progress: Some(id.to_string()),
        created_at: DateTime::from_timestamp(1_700_000_000 + id, 0).unwrap(),
        title: MediaTitle {
            romaji: Some("Sousou no Frieren".to_string()),
            english: Some("Frieren: Beyond Journey's End".to_string()),
            native: None,
        },
        media_id: Some(154587),
        artwork_url: Some("https://img/frieren.jpg".to_string()),
        media_url: Some("https://anilist.co/anime/154587".to_string()),
        score: None,
        repeat_count: None,
        note: None,
    }
}

/// Activity source backed by in-memory maps.
#[derive(Default)]
pub struct FakeSource {
    accounts: Mutex<HashMap<String, AccountId>>,
    activity: Mutex<HashMap<AccountId, Vec<ActivityEntry>>>,
    profile: Mutex<Option<ProfileFields>>,
    failing: Mutex<HashSet<AccountId>>,
    resolve_down: AtomicBool,
    pub profile_calls: AtomicUsize,
    pub activity_calls: AtomicUsize,
}

impl FakeSource {
    pub fn with_account(self, handle: &str, id: AccountId) -> Self {
        self.accounts
            .lock()
            .unwrap()
            .insert(handle.to_ascii_lowercase(), id);
        self
    }

    /// Replace the account's feed with `ids` (any order).
    pub fn set_activity(&self, account_id: AccountId, ids: &[ActivityId]) {
        let entries = ids.iter().copied().map(entry).collect();
        self.activity.lock().unwrap().insert(account_id, entries);
    }

    /// Profile returned by `fetch_profile`; `None` makes it fail.
    pub fn set_profile(&self, profile: Option<ProfileFields>) {
        *self.profile.lock().unwrap() = profile;
    }

    /// Make activity fetches for `account_id` fail (or succeed again).
    pub fn set_failing(&self, account_id: AccountId, failing: bool) {
        let mut set = self.failing.lock().unwrap();
        if failing {
            set.insert(account_id);
        } else {
            set.remove(&account_id);
        }
    }

    pub fn set_resolve_down(&self, down: bool) {
        self.resolve_down.store(down, Ordering::SeqCst);
    }
}

#[async_trait]
impl ActivitySource for FakeSource {
    fn name(&self) -> &str {
        "fake"
    }

    async fn resolve_account(&self, handle: &str) -> Result<AccountId, AnifeedError> {
        if self.resolve_down.load(Ordering::SeqCst) {
            return Err(AnifeedError::Adapter("connection refused".into()));
        }
        self.accounts
            .lock()
            .unwrap()
            .get(&handle.to_ascii_lowercase())
            .copied()
            .ok_or_else(|| AnifeedError::NotFound(format!("user '{handle}'")))
    }

    async fn fetch_profile(&self, _account_id: AccountId) -> Result<ProfileFields, AnifeedError> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        self.profile
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| AnifeedError::Adapter("profile unavailable".into()))
    }

    async fn fetch_recent_activity(
        &self,
        account_id: AccountId,
        _filter: MediaFilter,
        page_size: usize,
    ) -> Result<Vec<ActivityEntry>, AnifeedError> {
        self.activity_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(&account_id) {
            return Err(AnifeedError::Adapter("timeout".into()));
        }
        let mut entries = self
            .activity
            .lock()
            .unwrap()
            .get(&account_id)
            .cloned()
            .unwrap_or_default();
        entries.sort_by(|a, b| b.id.cmp(&a.id));
        entries.truncate(page_size);
        // Yield so concurrent polls get a chance to interleave.
        tokio::task::yield_now().await;
        Ok(entries)
    }

    async fn fetch_stats(&self, handle: &str) -> Result<UserStats, AnifeedError> {
        self.resolve_account(handle).await?;
        Ok(UserStats {
            handle: handle.to_string(),
            anime_count: 12,
            episodes_watched: 240,
            anime_mean_score: 78.5,
            manga_count: 3,
            chapters_read: 90,
            manga_mean_score: 70.0,
        })
    }
}

/// Channel that records everything it is asked to send.
#[derive(Default)]
pub struct RecordingSink {
    pub delivered: Mutex<Vec<(String, Notification)>>,
    pub sent: Mutex<Vec<OutgoingMessage>>,
    /// Replies and deliveries in the order they reached the sink.
    pub events: Mutex<Vec<String>>,
    failing_ids: Mutex<HashSet<ActivityId>>,
    stalled_target: Mutex<Option<String>>,
    /// Signalled when a delivery to the stalled target starts waiting.
    pub stall_entered: Notify,
    release: Notify,
}

impl RecordingSink {
    /// Make delivery of one activity id fail.
    pub fn fail_on(&self, activity_id: ActivityId) {
        self.failing_ids.lock().unwrap().insert(activity_id);
    }

    /// Hold deliveries to `target` until [`RecordingSink::release`].
    pub fn stall(&self, target: &str) {
        *self.stalled_target.lock().unwrap() = Some(target.to_string());
    }

    pub fn release(&self) {
        *self.stalled_target.lock().unwrap() = None;
        self.release.notify_waiters();
    }

    pub fn delivered_ids(&self) -> Vec<ActivityId> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .map(|(_, n)| n.activity_id)
            .collect()
    }

    pub fn replies(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.text.clone())
            .collect()
    }
}

#[async_trait]
impl Channel for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn start(&self) -> Result<mpsc::Receiver<IncomingMessage>, AnifeedError> {
        let (_tx, rx) = mpsc::channel(1);
        Ok(rx)
    }

    async fn send(&self, message: OutgoingMessage) -> Result<(), AnifeedError> {
        self.events
            .lock()
            .unwrap()
            .push(format!("reply: {}", message.text));
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn deliver(
        &self,
        target: &str,
        notification: &Notification,
    ) -> Result<(), AnifeedError> {
        let stalled = self.stalled_target.lock().unwrap().as_deref() == Some(target);
        if stalled {
            let released = self.release.notified();
            self.stall_entered.notify_one();
            released.await;
        }
        if self
            .failing_ids
            .lock()
            .unwrap()
            .contains(&notification.activity_id)
        {
            return Err(AnifeedError::Channel("Too Many Requests".into()));
        }
        self.events
            .lock()
            .unwrap()
            .push(format!("activity {}", notification.activity_id));
        self.delivered
            .lock()
            .unwrap()
            .push((target.to_string(), notification.clone()));
        Ok(())
    }

    async fn stop(&self) -> Result<(), AnifeedError> {
        Ok(())
    }
}

pub fn settings() -> EngineSettings {
    EngineSettings {
        page_size: 50,
        max_notifications: 15,
        profile_ttl: chrono::Duration::hours(24),
        delivery_timeout: Duration::from_secs(5),
    }
}

/// Engine over a fresh store and the given fakes.
pub async fn engine(source: Arc<FakeSource>, sink: Arc<RecordingSink>) -> Arc<Engine> {
    let store = test_store().await;
    Arc::new(Engine::new(store, source, sink, settings()))
}

/// A command message as the Telegram channel would produce it.
pub fn command(chat: &str, text: &str) -> IncomingMessage {
    IncomingMessage {
        id: uuid::Uuid::new_v4(),
        channel: "telegram".to_string(),
        sender_id: "42".to_string(),
        sender_name: Some("@ann".to_string()),
        text: text.to_string(),
        timestamp: Utc::now(),
        reply_target: chat.to_string(),
    }
}
