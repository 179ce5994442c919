use super::{Store, Subscription};
use anifeed_core::activity::{MediaFilter, ProfileFields, TitleLanguage};
use anifeed_core::error::AnifeedError;
use chrono::{TimeZone, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

async fn memory_pool() -> SqlitePool {
    let opts = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .create_if_missing(true);
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(opts)
        .await
        .unwrap()
}

/// Create an in-memory store for testing.
async fn test_store() -> Store {
    let pool = memory_pool().await;
    Store::run_migrations(&pool).await.unwrap();
    Store { pool }
}

fn sub(channel: &str, account: i64, handle: &str) -> Subscription {
    Subscription::new(channel, account, handle, MediaFilter::Both)
}

#[tokio::test]
async fn test_insert_and_list() {
    let store = test_store().await;
    store.insert_subscription(&sub("chat1", 1, "Alice")).await.unwrap();
    store
        .insert_subscription(&Subscription::new("chat1", 2, "Bob", MediaFilter::Manga))
        .await
        .unwrap();

    let all = store.list_all().await.unwrap();
    assert_eq!(all.len(), 2);
    let bob = all.iter().find(|s| s.account_id == 2).unwrap();
    assert_eq!(bob.account_handle, "Bob");
    assert_eq!(bob.media_filter, MediaFilter::Manga);
    assert_eq!(bob.last_seen_activity_id, None);
    assert!(bob.profile.is_none());
    assert_eq!(store.count_subscriptions().await.unwrap(), 2);
}

#[tokio::test]
async fn test_duplicate_insert_is_rejected() {
    let store = test_store().await;
    store.insert_subscription(&sub("chat1", 1, "Alice")).await.unwrap();
    let err = store
        .insert_subscription(&sub("chat1", 1, "alice"))
        .await
        .unwrap_err();
    assert!(matches!(err, AnifeedError::DuplicateSubscription(_)));

    // Same account in another channel is a separate subscription.
    store.insert_subscription(&sub("chat2", 1, "Alice")).await.unwrap();
    assert_eq!(store.count_subscriptions().await.unwrap(), 2);
}

#[tokio::test]
async fn test_remove_missing_is_not_found() {
    let store = test_store().await;
    let err = store.remove_subscription("chat1", 99).await.unwrap_err();
    assert!(matches!(err, AnifeedError::NotFound(_)));

    store.insert_subscription(&sub("chat1", 99, "Zed")).await.unwrap();
    store.remove_subscription("chat1", 99).await.unwrap();
    let err = store.remove_subscription("chat1", 99).await.unwrap_err();
    assert!(matches!(err, AnifeedError::NotFound(_)));
}

#[tokio::test]
async fn test_find_by_handle_is_case_insensitive_and_channel_scoped() {
    let store = test_store().await;
    store.insert_subscription(&sub("chat1", 1, "AliceW")).await.unwrap();
    store.insert_subscription(&sub("chat2", 2, "alicew")).await.unwrap();

    let found = store.find_by_handle("chat1", "ALICEW").await.unwrap().unwrap();
    assert_eq!(found.account_id, 1);
    assert_eq!(found.account_handle, "AliceW");

    let other = store.find_by_handle("chat2", "AliceW").await.unwrap().unwrap();
    assert_eq!(other.account_id, 2);

    assert!(store.find_by_handle("chat3", "alicew").await.unwrap().is_none());
}

#[tokio::test]
async fn test_update_watermark() {
    let store = test_store().await;
    store.insert_subscription(&sub("chat1", 1, "Alice")).await.unwrap();
    store.update_watermark("chat1", 1, 105).await.unwrap();

    let got = store.get_subscription("chat1", 1).await.unwrap().unwrap();
    assert_eq!(got.last_seen_activity_id, Some(105));

    let err = store.update_watermark("chat1", 2, 1).await.unwrap_err();
    assert!(matches!(err, AnifeedError::NotFound(_)));
}

#[tokio::test]
async fn test_update_profile_round_trips_snapshot() {
    let store = test_store().await;
    store.insert_subscription(&sub("chat1", 1, "Alice")).await.unwrap();
    let refreshed = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
    let fields = ProfileFields {
        avatar_url: Some("https://img/a.png".to_string()),
        accent_color: Some("#3db4f2".to_string()),
        title_language: Some(TitleLanguage::Native),
    };
    store
        .update_profile("chat1", 1, &fields, refreshed)
        .await
        .unwrap();

    let got = store.get_subscription("chat1", 1).await.unwrap().unwrap();
    let profile = got.profile.unwrap();
    assert_eq!(profile.fields, fields);
    assert_eq!(profile.refreshed_at, refreshed);
}

#[tokio::test]
async fn test_readd_after_remove_has_no_watermark() {
    let store = test_store().await;
    store.insert_subscription(&sub("chat1", 1, "Alice")).await.unwrap();
    store.update_watermark("chat1", 1, 500).await.unwrap();
    store.remove_subscription("chat1", 1).await.unwrap();
    store.insert_subscription(&sub("chat1", 1, "Alice")).await.unwrap();

    let got = store.get_subscription("chat1", 1).await.unwrap().unwrap();
    assert_eq!(got.last_seen_activity_id, None);
}

#[tokio::test]
async fn test_migrations_are_idempotent() {
    let pool = memory_pool().await;
    Store::run_migrations(&pool).await.unwrap();
    Store::run_migrations(&pool).await.unwrap();
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM _migrations")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 3);
}

#[tokio::test]
async fn test_foreign_tracked_users_table_left_alone() {
    let pool = memory_pool().await;
    sqlx::raw_sql(
        "CREATE TABLE tracked_users (channelId TEXT NOT NULL, anilistUserId INTEGER NOT NULL, \
         anilistUsername TEXT NOT NULL, lastActivityId INTEGER, \
         PRIMARY KEY (channelId, anilistUserId));
         INSERT INTO tracked_users VALUES ('1012345678901234567', 7, 'Legacy', 900);",
    )
    .execute(&pool)
    .await
    .unwrap();

    Store::run_migrations(&pool).await.unwrap();
    Store::run_migrations(&pool).await.unwrap();
    let store = Store { pool };

    assert!(store.list_all().await.unwrap().is_empty());

    let (count, watermark): (i64, Option<i64>) =
        sqlx::query_as("SELECT COUNT(*), MAX(lastActivityId) FROM tracked_users")
            .fetch_one(store.pool())
            .await
            .unwrap();
    assert_eq!(count, 1);
    assert_eq!(watermark, Some(900));
}
