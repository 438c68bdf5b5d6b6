use futures_lite::Stream;
use tokio::sync::watch;

use verifai_shared::SyncResult;

/// Turn a point-in-time cache query into a live stream.
///
/// Emits the current snapshot immediately, then re-runs the query after each
/// change notification, collapsing consecutive identical snapshots. A query
/// error is yielded once and ends the stream. Dropping the stream drops the
/// watch receiver, which releases the subscription.
pub(crate) fn live_query<T, F>(
    changes: watch::Receiver<u64>,
    query: F,
) -> impl Stream<Item = SyncResult<T>>
where
    T: Clone + PartialEq + Send + 'static,
    F: Fn() -> SyncResult<T> + Send + 'static,
{
    struct State<T, F> {
        changes: watch::Receiver<u64>,
        query: F,
        last: Option<T>,
        primed: bool,
        done: bool,
    }

    let seed = State { changes, query, last: None, primed: false, done: false };

    futures_lite::stream::unfold(seed, |mut state| async move {
        if state.done {
            return None;
        }
        loop {
            if state.primed {
                // sender gone means the cache itself was dropped
                if state.changes.changed().await.is_err() {
                    return None;
                }
            } else {
                state.primed = true;
            }

            match (state.query)() {
                Ok(snapshot) => {
                    if state.last.as_ref() == Some(&snapshot) {
                        continue;
                    }
                    state.last = Some(snapshot.clone());
                    return Some((Ok(snapshot), state));
                }
                Err(e) => {
                    state.done = true;
                    return Some((Err(e), state));
                }
            }
        }
    })
}

#[cfg(test)]
mod test {
    use futures_lite::StreamExt;

    use super::*;

    #[tokio::test]
    async fn emits_current_value_then_changes() {
        let (tx, rx) = watch::channel(0u64);
        let counter = std::sync::Arc::new(std::sync::atomic::AtomicI64::new(7));
        let source = counter.clone();

        let mut stream = Box::pin(live_query(rx, move || {
            Ok(source.load(std::sync::atomic::Ordering::SeqCst))
        }));

        assert_eq!(stream.next().await.unwrap().unwrap(), 7);

        counter.store(9, std::sync::atomic::Ordering::SeqCst);
        tx.send_modify(|v| *v += 1);
        assert_eq!(stream.next().await.unwrap().unwrap(), 9);

        // unchanged snapshots are collapsed; the stream ends once the
        // sender is gone rather than emitting a duplicate
        tx.send_modify(|v| *v += 1);
        drop(tx);
        assert!(stream.next().await.is_none());
    }
}
