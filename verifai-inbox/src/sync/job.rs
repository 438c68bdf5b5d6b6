use std::sync::Arc;

use async_trait::async_trait;

use crate::cache::NotificationCache;
use crate::remote::RemoteNotificationStore;
use crate::sync::pending::MutationQueue;
use crate::sync::scheduler::{WorkOutcome, Worker};

pub const SYNC_WORK_NAME: &str = "notification_sync_work";

const MAX_SYNC_RETRIES: u32 = 3;

/// Deferred sync: replays queued mutations and reconciles the cache once
/// connectivity is back.
///
/// Gives up after [`MAX_SYNC_RETRIES`] attempts; a new mutation or a manual
/// resync has to re-trigger it after that.
pub struct SyncWorker {
    cache: NotificationCache,
    remote: Arc<dyn RemoteNotificationStore>,
    pending: MutationQueue,
}

impl SyncWorker {
    pub fn new(
        cache: NotificationCache,
        remote: Arc<dyn RemoteNotificationStore>,
        pending: MutationQueue,
    ) -> Self {
        Self { cache, remote, pending }
    }
}

#[async_trait]
impl Worker for SyncWorker {
    async fn run(&self, attempt: u32) -> WorkOutcome {
        match super::run_sync(&self.cache, self.remote.as_ref(), &self.pending).await {
            Ok(()) => WorkOutcome::Success,
            Err(e) if attempt + 1 < MAX_SYNC_RETRIES => {
                tracing::warn!(error = %e, attempt, "deferred sync attempt failed");
                WorkOutcome::Retry
            }
            Err(e) => {
                tracing::error!(error = %e, attempt, "deferred sync exhausted its retries");
                WorkOutcome::Failure
            }
        }
    }
}
