use crate::{
    activity::{AccountId, ActivityEntry, MediaFilter, Notification, ProfileFields, UserStats},
    error::AnifeedError,
    message::{IncomingMessage, OutgoingMessage},
};
use async_trait::async_trait;

/// Activity source trait: where tracked accounts and their feeds come from.
///
/// Implementations validate upstream responses at the boundary: anything that
/// does not have the expected shape is an `AnifeedError::Adapter`, never a
/// partially filled value.
#[async_trait]
pub trait ActivitySource: Send + Sync {
    /// Human-readable source name.
    fn name(&self) -> &str;

    /// Resolve a display handle to its stable numeric account id.
    ///
    /// Returns `AnifeedError::NotFound` when the service has no such account.
    async fn resolve_account(&self, handle: &str) -> Result<AccountId, AnifeedError>;

    /// Fetch the account's presentation settings.
    async fn fetch_profile(&self, account_id: AccountId) -> Result<ProfileFields, AnifeedError>;

    /// Fetch up to `page_size` of the account's most recent list activity,
    /// newest first.
    async fn fetch_recent_activity(
        &self,
        account_id: AccountId,
        filter: MediaFilter,
        page_size: usize,
    ) -> Result<Vec<ActivityEntry>, AnifeedError>;

    /// Fill score, repeat count, and notes on `entries` from the account's
    /// list entries. Sources without that data keep the default no-op.
    async fn fetch_list_details(
        &self,
        _account_id: AccountId,
        _entries: &mut [ActivityEntry],
    ) -> Result<(), AnifeedError> {
        Ok(())
    }

    /// Fetch summary statistics for a handle.
    async fn fetch_stats(&self, handle: &str) -> Result<UserStats, AnifeedError>;
}

/// Messaging channel trait: command intake plus notification delivery.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name.
    fn name(&self) -> &str;

    /// Start listening for incoming command messages.
    async fn start(&self) -> Result<tokio::sync::mpsc::Receiver<IncomingMessage>, AnifeedError>;

    /// Send a plain-text reply.
    async fn send(&self, message: OutgoingMessage) -> Result<(), AnifeedError>;

    /// Render and deliver one activity notification to `target`.
    async fn deliver(&self, target: &str, notification: &Notification)
        -> Result<(), AnifeedError>;

    /// Graceful shutdown.
    async fn stop(&self) -> Result<(), AnifeedError>;
}
