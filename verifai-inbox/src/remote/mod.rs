mod http;

pub use http::HttpRemoteStore;

use async_trait::async_trait;

use verifai_shared::{Notification, SyncResult};

/// Authoritative notification collection.
///
/// Single-shot operations only: any call may fail with a connectivity or
/// permission error, which propagates to the caller. Retrying is the
/// deferred sync job's business, never this component's. Notifications are
/// created server-side; this client only reads and mutates them.
#[async_trait]
pub trait RemoteNotificationStore: Send + Sync {
    /// Latest notifications for a user, creation time descending.
    async fn fetch_page(&self, user_id: &str, limit: i64) -> SyncResult<Vec<Notification>>;

    /// The entire collection, for full resync.
    async fn fetch_all(&self) -> SyncResult<Vec<Notification>>;

    /// Batched read-state update.
    async fn update_read_state(&self, ids: &[String], read: bool) -> SyncResult<()>;

    /// Mark every unread notification of a user as read, in one batch.
    async fn mark_all_read(&self, user_id: &str) -> SyncResult<()>;

    /// Batched delete.
    async fn delete(&self, ids: &[String]) -> SyncResult<()>;

    /// Delete every notification owned by a user.
    async fn delete_all_for_user(&self, user_id: &str) -> SyncResult<()>;
}
