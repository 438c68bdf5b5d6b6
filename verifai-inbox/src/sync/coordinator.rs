use std::sync::Arc;

use futures_lite::Stream;

use verifai_shared::{AuthProvider, Notification, PageRequest, SyncError, SyncResult};

use crate::cache::NotificationCache;
use crate::config::AppConfig;
use crate::connectivity::{ConnectivityMonitor, HttpProbeMonitor};
use crate::remote::{HttpRemoteStore, RemoteNotificationStore};
use crate::sync::job::{SyncWorker, SYNC_WORK_NAME};
use crate::sync::pending::{MutationQueue, PendingOp};
use crate::sync::scheduler::{BackoffPolicy, TokioScheduler, WorkRequest, WorkScheduler};

/// Merges the local cache view with the remote collection.
///
/// Reads always come from the cache; mutations hit the cache first and the
/// remote store second. A remote failure never rolls the cache back - the
/// local view stays available and a later sync pass reconciles. Overlapping
/// mutations on the same id are last-write-wins.
pub struct SyncCoordinator {
    cache: NotificationCache,
    remote: Arc<dyn RemoteNotificationStore>,
    connectivity: Arc<dyn ConnectivityMonitor>,
    scheduler: Arc<dyn WorkScheduler>,
    auth: Arc<dyn AuthProvider>,
    pending: MutationQueue,
    backoff: BackoffPolicy,
}

impl SyncCoordinator {
    pub fn new(
        cache: NotificationCache,
        remote: Arc<dyn RemoteNotificationStore>,
        connectivity: Arc<dyn ConnectivityMonitor>,
        scheduler: Arc<dyn WorkScheduler>,
        auth: Arc<dyn AuthProvider>,
        backoff: BackoffPolicy,
    ) -> Self {
        Self {
            cache,
            remote,
            connectivity,
            scheduler,
            auth,
            pending: MutationQueue::default(),
            backoff,
        }
    }

    /// Wire up the coordinator from configuration: sqlite cache, HTTP remote
    /// store, probe-driven connectivity, in-process scheduler.
    ///
    /// Must be called from within a tokio runtime.
    pub fn bootstrap(config: &AppConfig, auth: Arc<dyn AuthProvider>) -> SyncResult<Self> {
        let cache = NotificationCache::open(&config.database_url, config.pool_size)?;
        let client = reqwest::Client::new();
        let remote = Arc::new(HttpRemoteStore::new(client.clone(), &config.remote_base_url));
        let connectivity: Arc<dyn ConnectivityMonitor> = Arc::new(HttpProbeMonitor::spawn(
            client,
            config.probe_url.clone(),
            config.probe_interval(),
        ));
        let scheduler = Arc::new(TokioScheduler::new(connectivity.clone()));

        Ok(Self::new(cache, remote, connectivity, scheduler, auth, config.backoff()))
    }

    /// Live inbox page for a user.
    ///
    /// Serves the cache immediately; when online, the latest remote page is
    /// fetched in the background and upserted, which the stream picks up
    /// through the cache's change feed. Refresh failures are logged and
    /// never disturb the local view.
    pub fn notifications(
        &self,
        user_id: &str,
        page: PageRequest,
    ) -> impl Stream<Item = SyncResult<Vec<Notification>>> {
        let stream = self.cache.watch_page(user_id, page);

        if self.connectivity.is_online() {
            let cache = self.cache.clone();
            let remote = self.remote.clone();
            let user = user_id.to_string();
            tokio::spawn(async move {
                if let Err(e) = refresh_into_cache(&cache, remote.as_ref(), &user, page.limit()).await
                {
                    tracing::warn!(error = %e, user_id = %user, "background page refresh failed");
                }
            });
        }

        stream
    }

    /// Fetch the latest remote page and upsert it into the cache.
    pub async fn refresh_page(&self, user_id: &str, page: PageRequest) -> SyncResult<()> {
        refresh_into_cache(&self.cache, self.remote.as_ref(), user_id, page.limit()).await
    }

    /// Live view of a notification group, served from the cache.
    pub fn grouped(&self, group: &str) -> impl Stream<Item = SyncResult<Vec<Notification>>> {
        self.cache.watch_group(group)
    }

    /// Live unread counter for a user, served from the cache.
    pub fn unread_count(&self, user_id: &str) -> impl Stream<Item = SyncResult<i64>> {
        self.cache.watch_unread_count(user_id)
    }

    pub async fn mark_read(&self, ids: &[String]) -> SyncResult<()> {
        self.cache.update_read_state(ids, true)?;
        self.apply_or_defer(PendingOp::SetRead { ids: ids.to_vec(), read: true })
            .await
    }

    /// Mark the signed-in user's whole inbox as read. Returns how many rows
    /// the cache flipped.
    pub async fn mark_all_read(&self) -> SyncResult<usize> {
        let user_id = self.current_user()?;
        let updated = self.cache.mark_all_read(&user_id)?;
        self.apply_or_defer(PendingOp::MarkAllRead { user_id }).await?;
        Ok(updated)
    }

    pub async fn delete(&self, ids: &[String]) -> SyncResult<()> {
        self.cache.delete_by_ids(ids)?;
        self.apply_or_defer(PendingOp::Delete { ids: ids.to_vec() })
            .await
    }

    /// Clear the signed-in user's whole inbox. Returns how many rows the
    /// cache removed.
    pub async fn clear_all(&self) -> SyncResult<usize> {
        let user_id = self.current_user()?;
        let removed = self.cache.delete_all_for_user(&user_id)?;
        self.apply_or_defer(PendingOp::DeleteAllForUser { user_id }).await?;
        Ok(removed)
    }

    /// Replay queued mutations and reconcile the cache wholesale from the
    /// remote collection. No-op while offline; the deferred job covers that
    /// case.
    pub async fn resync(&self) -> SyncResult<()> {
        if !self.connectivity.is_online() {
            tracing::debug!("skipping resync while offline");
            return Ok(());
        }
        super::run_sync(&self.cache, self.remote.as_ref(), &self.pending).await
    }

    /// Mutations not yet confirmed by the remote store.
    pub fn pending_mutations(&self) -> usize {
        self.pending.len()
    }

    async fn apply_or_defer(&self, op: PendingOp) -> SyncResult<()> {
        if !self.connectivity.is_online() {
            self.pending.push(op);
            self.enqueue_deferred_sync();
            return Ok(());
        }

        match op.apply(self.remote.as_ref()).await {
            Ok(()) => Ok(()),
            Err(e) => {
                // surfaced either way; only a connectivity failure is
                // recoverable by the deferred job
                if e.is_connectivity() {
                    self.pending.push(op);
                    self.enqueue_deferred_sync();
                }
                Err(e)
            }
        }
    }

    fn enqueue_deferred_sync(&self) {
        let worker = Arc::new(SyncWorker::new(
            self.cache.clone(),
            self.remote.clone(),
            self.pending.clone(),
        ));
        let request = WorkRequest {
            name: SYNC_WORK_NAME.to_string(),
            requires_network: true,
            backoff: self.backoff,
        };
        self.scheduler.enqueue_unique(request, worker);
        tracing::debug!(work = SYNC_WORK_NAME, queued = self.pending.len(), "deferred sync enqueued");
    }

    fn current_user(&self) -> SyncResult<String> {
        self.auth
            .current_user_id()
            .ok_or_else(|| SyncError::permission_denied("no signed-in user"))
    }
}

async fn refresh_into_cache(
    cache: &NotificationCache,
    remote: &dyn RemoteNotificationStore,
    user_id: &str,
    limit: i64,
) -> SyncResult<()> {
    let latest = remote.fetch_page(user_id, limit).await?;
    cache.upsert(&latest)?;
    Ok(())
}
