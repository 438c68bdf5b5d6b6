mod coordinator;
mod job;
mod pending;
mod scheduler;

pub use coordinator::SyncCoordinator;
pub use job::{SyncWorker, SYNC_WORK_NAME};
pub use pending::{MutationQueue, PendingOp};
pub use scheduler::{
    BackoffPolicy, JobState, TokioScheduler, WorkOutcome, WorkRequest, WorkScheduler, Worker,
};

use crate::cache::NotificationCache;
use crate::remote::RemoteNotificationStore;
use verifai_shared::SyncResult;

/// One full sync pass: replay queued mutations to the remote store, then
/// reconcile the cache wholesale from the remote snapshot.
///
/// Replayed mutations leave the queue only once the remote store accepted
/// them; a failure keeps the unapplied tail queued for the next attempt.
pub(crate) async fn run_sync(
    cache: &NotificationCache,
    remote: &dyn RemoteNotificationStore,
    pending: &MutationQueue,
) -> SyncResult<()> {
    let ops = pending.drain();
    for (index, op) in ops.iter().enumerate() {
        if let Err(e) = op.apply(remote).await {
            pending.requeue_front(ops[index..].to_vec());
            tracing::warn!(error = %e, queued = pending.len(), "mutation replay interrupted");
            return Err(e);
        }
    }

    let snapshot = remote.fetch_all().await?;
    cache.replace_all(&snapshot)?;
    tracing::info!(count = snapshot.len(), "cache reconciled from remote");
    Ok(())
}
