//! In-memory subscription index and per-subscription locks.
//!
//! The index mirrors the store. Callers write to the store first and only
//! touch the index once the write has returned `Ok`.

use anifeed_core::activity::{AccountId, ActivityId, ProfileSnapshot};
use anifeed_store::Subscription;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// channel_id → account_id → subscription.
#[derive(Default)]
pub struct SubscriptionIndex {
    inner: RwLock<HashMap<String, BTreeMap<AccountId, Subscription>>>,
}

impl SubscriptionIndex {
    /// Replace the whole index with `subs`. Returns how many were loaded.
    pub async fn warm(&self, subs: Vec<Subscription>) -> usize {
        let mut map: HashMap<String, BTreeMap<AccountId, Subscription>> = HashMap::new();
        let count = subs.len();
        for sub in subs {
            map.entry(sub.channel_id.clone())
                .or_default()
                .insert(sub.account_id, sub);
        }
        *self.inner.write().await = map;
        count
    }

    pub async fn get(&self, channel_id: &str, account_id: AccountId) -> Option<Subscription> {
        self.inner
            .read()
            .await
            .get(channel_id)
            .and_then(|accounts| accounts.get(&account_id))
            .cloned()
    }

    pub async fn insert(&self, sub: Subscription) {
        self.inner
            .write()
            .await
            .entry(sub.channel_id.clone())
            .or_default()
            .insert(sub.account_id, sub);
    }

    pub async fn remove(&self, channel_id: &str, account_id: AccountId) -> Option<Subscription> {
        let mut inner = self.inner.write().await;
        let accounts = inner.get_mut(channel_id)?;
        let removed = accounts.remove(&account_id);
        if accounts.is_empty() {
            inner.remove(channel_id);
        }
        removed
    }

    /// Case-insensitive handle lookup within one channel.
    pub async fn find_by_handle(&self, channel_id: &str, handle: &str) -> Option<Subscription> {
        let handle = handle.trim();
        self.inner
            .read()
            .await
            .get(channel_id)?
            .values()
            .find(|s| s.account_handle.eq_ignore_ascii_case(handle))
            .cloned()
    }

    /// Subscriptions of one channel, ordered by account id.
    pub async fn list_channel(&self, channel_id: &str) -> Vec<Subscription> {
        self.inner
            .read()
            .await
            .get(channel_id)
            .map(|accounts| accounts.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Every (channel_id, account_id) key currently tracked.
    pub async fn keys(&self) -> Vec<(String, AccountId)> {
        self.inner
            .read()
            .await
            .iter()
            .flat_map(|(channel, accounts)| {
                accounts.keys().map(move |account| (channel.clone(), *account))
            })
            .collect()
    }

    pub async fn set_watermark(&self, channel_id: &str, account_id: AccountId, id: ActivityId) {
        if let Some(sub) = self
            .inner
            .write()
            .await
            .get_mut(channel_id)
            .and_then(|accounts| accounts.get_mut(&account_id))
        {
            sub.last_seen_activity_id = Some(id);
        }
    }

    pub async fn set_profile(
        &self,
        channel_id: &str,
        account_id: AccountId,
        snapshot: ProfileSnapshot,
    ) {
        if let Some(sub) = self
            .inner
            .write()
            .await
            .get_mut(channel_id)
            .and_then(|accounts| accounts.get_mut(&account_id))
        {
            sub.profile = Some(snapshot);
        }
    }
}

type LockKey = (String, AccountId);

/// One async mutex per (channel_id, account_id).
///
/// Polls, tracks, and untracks of the same key run one at a time; different
/// keys never contend.
#[derive(Default)]
pub struct KeyLocks {
    locks: Mutex<HashMap<LockKey, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    /// The lock for a key, created on first use.
    pub async fn lock_for(&self, channel_id: &str, account_id: AccountId) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .await
            .entry((channel_id.to_string(), account_id))
            .or_default()
            .clone()
    }

    /// Drop locks nobody holds or waits on.
    ///
    /// New handles are only cloned out under the registry lock, so a lock
    /// whose sole owner is the registry can be removed safely.
    pub async fn prune(&self) -> usize {
        let mut locks = self.locks.lock().await;
        let before = locks.len();
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before - locks.len()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }
}
