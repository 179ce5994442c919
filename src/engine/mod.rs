//! Activity engine: subscription index, diff-and-notify polling, and the
//! track/untrack/list operations the command surface maps onto.
//!
//! Every mutation goes to the store first; the index follows only after the
//! store write succeeded.

mod diff;
mod index;


use diff::{advance, select_new_entries, NewEntries};
use index::{KeyLocks, SubscriptionIndex};

use anifeed_core::{
    activity::{AccountId, ActivityId, MediaFilter, Notification, ProfileFields, ProfileSnapshot},
    config::{AniListConfig, SchedulerConfig},
    error::AnifeedError,
    traits::{ActivitySource, Channel},
};
use anifeed_store::{profile, Store, Subscription};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, OwnedSemaphorePermit};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Tunables for polling.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Entries fetched per poll.
    pub page_size: usize,
    /// Most notifications delivered for one subscription per poll.
    pub max_notifications: usize,
    pub profile_ttl: chrono::Duration,
    /// Upper bound on one sink call.
    pub delivery_timeout: Duration,
}

impl EngineSettings {
    pub fn from_config(anilist: &AniListConfig, scheduler: &SchedulerConfig) -> Self {
        Self {
            page_size: anilist.page_size.max(1),
            max_notifications: scheduler.max_notifications_per_poll,
            profile_ttl: scheduler.profile_ttl(),
            delivery_timeout: scheduler.delivery_timeout(),
        }
    }
}

/// What one `poll_one` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The subscription no longer exists.
    Missing,
    /// The account has no list activity at all.
    NoActivity,
    /// Nothing newer than the watermark.
    UpToDate,
    /// New entries were handed to the sink and the watermark advanced.
    Delivered {
        delivered: usize,
        skipped: usize,
        failed: usize,
        watermark: ActivityId,
    },
}

/// A freshly registered subscription and its first poll.
pub struct Tracked {
    pub subscription: Subscription,
    pub first_poll: FirstPoll,
}

/// A spawned first poll that waits until the caller lets it go, so the
/// confirmation reply reaches the chat before any notification.
///
/// Dropping it without calling [`FirstPoll::start`] also lets the poll run.
pub struct FirstPoll {
    go: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl FirstPoll {
    pub fn start(self) -> JoinHandle<()> {
        let _ = self.go.send(());
        self.task
    }
}

/// The diff-and-notify engine.
pub struct Engine {
    store: Store,
    source: Arc<dyn ActivitySource>,
    sink: Arc<dyn Channel>,
    index: SubscriptionIndex,
    locks: KeyLocks,
    settings: EngineSettings,
}

impl Engine {
    pub fn new(
        store: Store,
        source: Arc<dyn ActivitySource>,
        sink: Arc<dyn Channel>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            source,
            sink,
            index: SubscriptionIndex::default(),
            locks: KeyLocks::default(),
            settings,
        }
    }

    /// Load every stored subscription into the index.
    pub async fn warm(&self) -> Result<usize, AnifeedError> {
        let subs = self.store.list_all().await?;
        let count = self.index.warm(subs).await;
        info!("subscription index warmed: {count} subscriptions");
        Ok(count)
    }

    pub fn source(&self) -> &Arc<dyn ActivitySource> {
        &self.source
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Every tracked (channel_id, account_id) key.
    pub async fn keys(&self) -> Vec<(String, AccountId)> {
        self.index.keys().await
    }

    /// Release per-key locks that nobody holds.
    pub async fn prune_locks(&self) {
        let pruned = self.locks.prune().await;
        if pruned > 0 {
            debug!("pruned {pruned} idle subscription locks");
        }
    }

    /// Subscriptions registered for a channel.
    pub async fn list(&self, channel_id: &str) -> Vec<Subscription> {
        self.index.list_channel(channel_id).await
    }

    /// Register `handle` for `channel_id` without polling it.
    ///
    /// Fails with `NotFound` for unknown handles, `Adapter` when the service is
    /// unreachable, and `DuplicateSubscription` if already tracked here.
    pub async fn register(
        &self,
        channel_id: &str,
        handle: &str,
        filter: MediaFilter,
    ) -> Result<Subscription, AnifeedError> {
        let handle = handle.trim();
        let account_id = self.source.resolve_account(handle).await?;

        let lock = self.locks.lock_for(channel_id, account_id).await;
        let _guard = lock.lock().await;

        if self.index.get(channel_id, account_id).await.is_some() {
            return Err(AnifeedError::DuplicateSubscription(format!(
                "{handle} in channel {channel_id}"
            )));
        }

        let sub = Subscription::new(channel_id, account_id, handle, filter);
        self.store.insert_subscription(&sub).await?;
        self.index.insert(sub.clone()).await;

        info!("tracking {handle} ({account_id}) in {channel_id}, filter {filter}");
        Ok(sub)
    }

    /// Register `handle` and queue its first poll in the background.
    pub async fn track(
        self: &Arc<Self>,
        channel_id: &str,
        handle: &str,
        filter: MediaFilter,
    ) -> Result<Tracked, AnifeedError> {
        let subscription = self.register(channel_id, handle, filter).await?;

        let engine = self.clone();
        let channel_id = subscription.channel_id.clone();
        let account_id = subscription.account_id;
        let (go, ready) = oneshot::channel();
        let task = tokio::spawn(async move {
            let _ = ready.await;
            engine.poll_logged(&channel_id, account_id).await;
        });

        Ok(Tracked {
            subscription,
            first_poll: FirstPoll { go, task },
        })
    }

    /// Stop tracking `handle` (case-insensitive) in `channel_id`.
    pub async fn untrack(
        &self,
        channel_id: &str,
        handle: &str,
    ) -> Result<Subscription, AnifeedError> {
        let sub = self
            .index
            .find_by_handle(channel_id, handle)
            .await
            .ok_or_else(|| {
                AnifeedError::NotFound(format!("{} in channel {channel_id}", handle.trim()))
            })?;

        let lock = self.locks.lock_for(channel_id, sub.account_id).await;
        let _guard = lock.lock().await;

        self.store
            .remove_subscription(channel_id, sub.account_id)
            .await?;
        self.index.remove(channel_id, sub.account_id).await;

        info!(
            "untracked {} ({}) in {channel_id}",
            sub.account_handle, sub.account_id
        );
        Ok(sub)
    }

    /// Poll one subscription, logging instead of returning failures.
    pub async fn poll_logged(&self, channel_id: &str, account_id: AccountId) {
        match self.poll_one(channel_id, account_id).await {
            Ok(outcome) => debug!("poll {channel_id}/{account_id}: {outcome:?}"),
            Err(e) if e.is_transient() => {
                warn!("poll {channel_id}/{account_id} failed, retrying next sweep: {e}")
            }
            Err(e) => error!("poll {channel_id}/{account_id} failed: {e}"),
        }
    }

    /// Poll one subscription now.
    pub async fn poll_one(
        &self,
        channel_id: &str,
        account_id: AccountId,
    ) -> Result<PollOutcome, AnifeedError> {
        self.poll_one_at(channel_id, account_id, Utc::now()).await
    }

    /// Poll one subscription as of `now`.
    ///
    /// An adapter failure while fetching activity aborts the poll with the
    /// watermark untouched. Sink failures are counted, never retried.
    pub async fn poll_one_at(
        &self,
        channel_id: &str,
        account_id: AccountId,
        now: DateTime<Utc>,
    ) -> Result<PollOutcome, AnifeedError> {
        self.poll_gated(channel_id, account_id, now, None).await
    }

    /// Poll one subscription while holding a sweep slot.
    ///
    /// The slot covers the adapter calls only and is released before any
    /// sink call, so a slow chat never holds up polls of other subscriptions.
    pub async fn poll_one_in_slot(
        &self,
        channel_id: &str,
        account_id: AccountId,
        slot: OwnedSemaphorePermit,
    ) -> Result<PollOutcome, AnifeedError> {
        self.poll_gated(channel_id, account_id, Utc::now(), Some(slot))
            .await
    }

    async fn poll_gated(
        &self,
        channel_id: &str,
        account_id: AccountId,
        now: DateTime<Utc>,
        slot: Option<OwnedSemaphorePermit>,
    ) -> Result<PollOutcome, AnifeedError> {
        let lock = self.locks.lock_for(channel_id, account_id).await;
        let _guard = lock.lock().await;

        let Some(sub) = self.index.get(channel_id, account_id).await else {
            return Ok(PollOutcome::Missing);
        };

        let profile = self.refresh_profile(&sub, now).await;

        let fetched = self
            .source
            .fetch_recent_activity(account_id, sub.media_filter, self.settings.page_size)
            .await?;

        let Some(mut fresh) = select_new_entries(
            &fetched,
            sub.last_seen_activity_id,
            self.settings.max_notifications,
        ) else {
            return Ok(PollOutcome::NoActivity);
        };

        if sub
            .last_seen_activity_id
            .is_some_and(|w| fresh.newest <= w)
        {
            return Ok(PollOutcome::UpToDate);
        }

        info!(
            "new activity for {} in {channel_id}: {:?}",
            sub.account_handle,
            fresh.deliver.iter().map(|e| e.id).collect::<Vec<_>>()
        );
        if fresh.skipped > 0 {
            warn!(
                "{}: {} entries over the per-poll cap were skipped",
                sub.account_handle, fresh.skipped
            );
        }

        if let Err(e) = self
            .source
            .fetch_list_details(account_id, &mut fresh.deliver)
            .await
        {
            warn!("list details for {} unavailable: {e}", sub.account_handle);
        }
        drop(slot);

        let (delivered, failed) = self
            .deliver_all(channel_id, &sub.account_handle, profile.as_ref(), &fresh)
            .await;

        let watermark = advance(sub.last_seen_activity_id, fresh.newest);
        self.store
            .update_watermark(channel_id, account_id, watermark)
            .await?;
        self.index
            .set_watermark(channel_id, account_id, watermark)
            .await;
        debug!("watermark for {channel_id}/{account_id} advanced to {watermark}");

        Ok(PollOutcome::Delivered {
            delivered,
            skipped: fresh.skipped,
            failed,
            watermark,
        })
    }

    /// Hand each entry to the sink, oldest first. Returns (delivered, failed).
    async fn deliver_all(
        &self,
        channel_id: &str,
        handle: &str,
        profile: Option<&ProfileFields>,
        fresh: &NewEntries,
    ) -> (usize, usize) {
        let mut delivered = 0;
        let mut failed = 0;
        for entry in &fresh.deliver {
            let notification = Notification::from_activity(handle, profile, entry);
            let attempt = tokio::time::timeout(
                self.settings.delivery_timeout,
                self.sink.deliver(channel_id, &notification),
            )
            .await;
            match attempt {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => {
                    warn!("delivery of activity {} to {channel_id} failed: {e}", entry.id);
                    failed += 1;
                }
                Err(_) => {
                    warn!(
                        "delivery of activity {} to {channel_id} timed out after {:?}",
                        entry.id, self.settings.delivery_timeout
                    );
                    failed += 1;
                }
            }
        }
        (delivered, failed)
    }

    /// Refresh the cached profile if it is stale and return the fields to
    /// render with. Failures keep whatever was cached.
    async fn refresh_profile(
        &self,
        sub: &Subscription,
        now: DateTime<Utc>,
    ) -> Option<ProfileFields> {
        let cached = sub.profile.as_ref();
        if !profile::is_stale(cached, now, self.settings.profile_ttl) {
            return cached.map(|s| s.fields.clone());
        }

        let fetched = match self.source.fetch_profile(sub.account_id).await {
            Ok(fields) => fields,
            Err(e) => {
                warn!("profile refresh for {} failed: {e}", sub.account_handle);
                return cached.map(|s| s.fields.clone());
            }
        };

        let merged = profile::merge(cached.map(|s| &s.fields), fetched);
        match self
            .store
            .update_profile(&sub.channel_id, sub.account_id, &merged, now)
            .await
        {
            Ok(()) => {
                self.index
                    .set_profile(
                        &sub.channel_id,
                        sub.account_id,
                        ProfileSnapshot {
                            fields: merged.clone(),
                            refreshed_at: now,
                        },
                    )
                    .await;
            }
            Err(e) => warn!("failed to persist profile for {}: {e}", sub.account_handle),
        }
        Some(merged)
    }
}
