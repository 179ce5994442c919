//! Profile cache policy: when to refresh, and how a refresh combines with
//! what is already cached. Pure functions; persistence lives in [`crate::Store`].

use anifeed_core::activity::{ProfileFields, ProfileSnapshot};
use chrono::{DateTime, Duration, Utc};

/// True if there is no cached profile or it is older than `ttl`.
pub fn is_stale(entry: Option<&ProfileSnapshot>, now: DateTime<Utc>, ttl: Duration) -> bool {
    match entry {
        None => true,
        Some(snapshot) => now - snapshot.refreshed_at > ttl,
    }
}

/// Combine freshly fetched fields with the cached ones.
///
/// A successful fetch replaces the cache whole, so a setting the user cleared
/// upstream is cleared here too. A failed fetch never reaches this function,
/// which keeps failures from nulling out the cache.
pub fn merge(_existing: Option<&ProfileFields>, fetched: ProfileFields) -> ProfileFields {
    fetched
}
