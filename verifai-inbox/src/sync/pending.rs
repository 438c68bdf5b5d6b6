use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use verifai_shared::SyncResult;

use crate::remote::RemoteNotificationStore;

/// A mutation that was applied to the cache but has not reached the remote
/// store yet.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingOp {
    SetRead { ids: Vec<String>, read: bool },
    MarkAllRead { user_id: String },
    Delete { ids: Vec<String> },
    DeleteAllForUser { user_id: String },
}

impl PendingOp {
    /// Replay this mutation against the remote store as one batch.
    pub(crate) async fn apply(&self, remote: &dyn RemoteNotificationStore) -> SyncResult<()> {
        match self {
            Self::SetRead { ids, read } => remote.update_read_state(ids, *read).await,
            Self::MarkAllRead { user_id } => remote.mark_all_read(user_id).await,
            Self::Delete { ids } => remote.delete(ids).await,
            Self::DeleteAllForUser { user_id } => remote.delete_all_for_user(user_id).await,
        }
    }
}

/// In-memory queue of mutations awaiting replay.
///
/// Re-enqueueing the deferred sync job is last-write-wins on the job queue
/// only; mutations accumulate here across replacements until a sync pass
/// drains them in order.
#[derive(Clone, Default)]
pub struct MutationQueue {
    ops: Arc<Mutex<VecDeque<PendingOp>>>,
}

impl MutationQueue {
    pub fn push(&self, op: PendingOp) {
        self.ops.lock().expect("mutation queue poisoned").push_back(op);
    }

    /// Take every queued mutation, oldest first.
    pub fn drain(&self) -> Vec<PendingOp> {
        self.ops
            .lock()
            .expect("mutation queue poisoned")
            .drain(..)
            .collect()
    }

    /// Put unapplied mutations back ahead of anything queued since the drain.
    pub fn requeue_front(&self, ops: Vec<PendingOp>) {
        let mut queue = self.ops.lock().expect("mutation queue poisoned");
        for op in ops.into_iter().rev() {
            queue.push_front(op);
        }
    }

    pub fn len(&self) -> usize {
        self.ops.lock().expect("mutation queue poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn requeue_preserves_order_ahead_of_later_pushes() {
        let queue = MutationQueue::default();
        queue.push(PendingOp::MarkAllRead { user_id: "u1".into() });
        queue.push(PendingOp::Delete { ids: vec!["a".into()] });

        let drained = queue.drain();
        assert_eq!(drained.len(), 2);

        queue.push(PendingOp::DeleteAllForUser { user_id: "u2".into() });
        queue.requeue_front(drained[1..].to_vec());

        let replayed = queue.drain();
        assert_eq!(
            replayed,
            vec![
                PendingOp::Delete { ids: vec!["a".into()] },
                PendingOp::DeleteAllForUser { user_id: "u2".into() },
            ]
        );
    }
}
