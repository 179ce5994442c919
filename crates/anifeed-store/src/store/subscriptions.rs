//! Subscription CRUD, watermark advances, and profile cache writes.

use super::Store;
use anifeed_core::{
    activity::{AccountId, ActivityId, MediaFilter, ProfileFields, ProfileSnapshot, TitleLanguage},
    error::AnifeedError,
};
use chrono::{DateTime, Utc};
use tracing::warn;

/// One tracked (channel, account) pairing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub channel_id: String,
    pub account_id: AccountId,
    /// Handle as typed at registration, case preserved.
    pub account_handle: String,
    /// Highest activity id already relayed; `None` until the first poll.
    pub last_seen_activity_id: Option<ActivityId>,
    pub media_filter: MediaFilter,
    pub profile: Option<ProfileSnapshot>,
}

impl Subscription {
    /// A fresh, never-polled subscription.
    pub fn new(
        channel_id: impl Into<String>,
        account_id: AccountId,
        account_handle: impl Into<String>,
        media_filter: MediaFilter,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            account_id,
            account_handle: account_handle.into(),
            last_seen_activity_id: None,
            media_filter,
            profile: None,
        }
    }
}

/// (channel_id, account_id, account_handle, last_activity_id, media_filter,
///  avatar_url, accent_color, title_language, profile_refreshed_at)
type SubscriptionRow = (
    String,
    i64,
    String,
    Option<i64>,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
);

const SELECT_COLUMNS: &str = "SELECT channel_id, account_id, account_handle, last_activity_id, \
     media_filter, avatar_url, accent_color, title_language, profile_refreshed_at \
     FROM subscriptions";

fn from_row(row: SubscriptionRow) -> Subscription {
    let (
        channel_id,
        account_id,
        account_handle,
        last_seen_activity_id,
        media_filter,
        avatar_url,
        accent_color,
        title_language,
        refreshed_at,
    ) = row;

    let media_filter = media_filter.parse().unwrap_or_else(|e| {
        warn!("subscription {channel_id}/{account_id}: {e}, using 'both'");
        MediaFilter::Both
    });

    // A profile only counts as cached once it has a refresh timestamp.
    let profile = refreshed_at
        .and_then(|ts| DateTime::parse_from_rfc3339(&ts).ok())
        .map(|ts| ProfileSnapshot {
            fields: ProfileFields {
                avatar_url,
                accent_color,
                title_language: title_language.as_deref().and_then(TitleLanguage::parse),
            },
            refreshed_at: ts.with_timezone(&Utc),
        });

    Subscription {
        channel_id,
        account_id,
        account_handle,
        last_seen_activity_id,
        media_filter,
        profile,
    }
}

impl Store {
    /// Insert a new subscription.
    ///
    /// Fails with `DuplicateSubscription` if the (channel, account) pair exists.
    pub async fn insert_subscription(&self, sub: &Subscription) -> Result<(), AnifeedError> {
        let result = sqlx::query(
            "INSERT INTO subscriptions \
             (channel_id, account_id, account_handle, last_activity_id, media_filter) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&sub.channel_id)
        .bind(sub.account_id)
        .bind(&sub.account_handle)
        .bind(sub.last_seen_activity_id)
        .bind(sub.media_filter.as_str())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(AnifeedError::DuplicateSubscription(format!(
                    "{} in channel {}",
                    sub.account_handle, sub.channel_id
                )))
            }
            Err(e) => Err(AnifeedError::Store(format!("insert subscription: {e}"))),
        }
    }

    /// Remove a subscription. Fails with `NotFound` if absent.
    pub async fn remove_subscription(
        &self,
        channel_id: &str,
        account_id: AccountId,
    ) -> Result<(), AnifeedError> {
        let result =
            sqlx::query("DELETE FROM subscriptions WHERE channel_id = ? AND account_id = ?")
                .bind(channel_id)
                .bind(account_id)
                .execute(&self.pool)
                .await
                .map_err(|e| AnifeedError::Store(format!("remove subscription: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(AnifeedError::NotFound(format!(
                "account {account_id} in channel {channel_id}"
            )));
        }
        Ok(())
    }

    /// Fetch one subscription by key.
    pub async fn get_subscription(
        &self,
        channel_id: &str,
        account_id: AccountId,
    ) -> Result<Option<Subscription>, AnifeedError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE channel_id = ? AND account_id = ?"
        ))
        .bind(channel_id)
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AnifeedError::Store(format!("get subscription: {e}")))?;
        Ok(row.map(from_row))
    }

    /// Case-insensitive handle lookup within one channel.
    pub async fn find_by_handle(
        &self,
        channel_id: &str,
        handle: &str,
    ) -> Result<Option<Subscription>, AnifeedError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE channel_id = ? AND account_handle = ? COLLATE NOCASE \
             ORDER BY created_at LIMIT 1"
        ))
        .bind(channel_id)
        .bind(handle.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AnifeedError::Store(format!("find by handle: {e}")))?;
        Ok(row.map(from_row))
    }

    /// Set the watermark. Monotonicity is the caller's responsibility.
    pub async fn update_watermark(
        &self,
        channel_id: &str,
        account_id: AccountId,
        activity_id: ActivityId,
    ) -> Result<(), AnifeedError> {
        let result = sqlx::query(
            "UPDATE subscriptions SET last_activity_id = ? \
             WHERE channel_id = ? AND account_id = ?",
        )
        .bind(activity_id)
        .bind(channel_id)
        .bind(account_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AnifeedError::Store(format!("update watermark: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(AnifeedError::NotFound(format!(
                "account {account_id} in channel {channel_id}"
            )));
        }
        Ok(())
    }

    /// Persist refreshed profile fields.
    pub async fn update_profile(
        &self,
        channel_id: &str,
        account_id: AccountId,
        fields: &ProfileFields,
        refreshed_at: DateTime<Utc>,
    ) -> Result<(), AnifeedError> {
        let result = sqlx::query(
            "UPDATE subscriptions SET avatar_url = ?, accent_color = ?, title_language = ?, \
             profile_refreshed_at = ? WHERE channel_id = ? AND account_id = ?",
        )
        .bind(fields.avatar_url.as_deref())
        .bind(fields.accent_color.as_deref())
        .bind(fields.title_language.map(|l| l.as_str()))
        .bind(refreshed_at.to_rfc3339())
        .bind(channel_id)
        .bind(account_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AnifeedError::Store(format!("update profile: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(AnifeedError::NotFound(format!(
                "account {account_id} in channel {channel_id}"
            )));
        }
        Ok(())
    }

    /// Every subscription, ordered by channel then registration time.
    pub async fn list_all(&self) -> Result<Vec<Subscription>, AnifeedError> {
        let rows: Vec<SubscriptionRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} ORDER BY channel_id, created_at"))
                .fetch_all(&self.pool)
                .await
                .map_err(|e| AnifeedError::Store(format!("list subscriptions: {e}")))?;
        Ok(rows.into_iter().map(from_row).collect())
    }

    /// Number of stored subscriptions.
    pub async fn count_subscriptions(&self) -> Result<i64, AnifeedError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM subscriptions")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AnifeedError::Store(format!("count subscriptions: {e}")))?;
        Ok(count)
    }
}
