use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStatus {
    Available,
    Unavailable,
}

impl NetworkStatus {
    pub fn is_online(self) -> bool {
        matches!(self, NetworkStatus::Available)
    }
}

/// Two-state connectivity contract consumed by the sync coordinator.
///
/// Whatever actually watches the network (platform callbacks, a probe loop)
/// is an implementation detail behind this trait.
pub trait ConnectivityMonitor: Send + Sync {
    /// Point-in-time online state.
    fn is_online(&self) -> bool;

    /// Live stream of status transitions. Dropping the receiver detaches the
    /// observer.
    fn observe(&self) -> watch::Receiver<NetworkStatus>;
}

/// Monitor fed by the host platform's connectivity callbacks.
pub struct CallbackMonitor {
    status: Arc<watch::Sender<NetworkStatus>>,
}

impl CallbackMonitor {
    pub fn new(initial: NetworkStatus) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { status: Arc::new(tx) }
    }

    /// Called by the platform adapter on every connectivity callback.
    /// Observers are only woken on an actual transition.
    pub fn set_status(&self, next: NetworkStatus) {
        self.status.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            tracing::info!(status = ?next, "network status changed");
            *current = next;
            true
        });
    }
}

impl ConnectivityMonitor for CallbackMonitor {
    fn is_online(&self) -> bool {
        self.status.borrow().is_online()
    }

    fn observe(&self) -> watch::Receiver<NetworkStatus> {
        self.status.subscribe()
    }
}

/// Monitor that derives connectivity by polling a probe URL.
///
/// Useful where no platform callback exists; the probe loop publishes
/// through the same transition-only channel as [`CallbackMonitor`].
pub struct HttpProbeMonitor {
    inner: CallbackMonitor,
    probe: JoinHandle<()>,
}

impl HttpProbeMonitor {
    /// Must be called from within a tokio runtime.
    pub fn spawn(client: reqwest::Client, probe_url: String, interval: Duration) -> Self {
        let inner = CallbackMonitor::new(NetworkStatus::Unavailable);
        let status = CallbackMonitor { status: inner.status.clone() };

        let probe = tokio::spawn(async move {
            loop {
                let online = match client.head(&probe_url).send().await {
                    Ok(response) => response.status().is_success(),
                    Err(e) => {
                        tracing::trace!(error = %e, "connectivity probe failed");
                        false
                    }
                };
                status.set_status(if online {
                    NetworkStatus::Available
                } else {
                    NetworkStatus::Unavailable
                });
                tokio::time::sleep(interval).await;
            }
        });

        Self { inner, probe }
    }
}

impl ConnectivityMonitor for HttpProbeMonitor {
    fn is_online(&self) -> bool {
        self.inner.is_online()
    }

    fn observe(&self) -> watch::Receiver<NetworkStatus> {
        self.inner.observe()
    }
}

impl Drop for HttpProbeMonitor {
    fn drop(&mut self) {
        self.probe.abort();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn transitions_wake_observers_once() {
        let monitor = CallbackMonitor::new(NetworkStatus::Unavailable);
        let mut observer = monitor.observe();
        assert!(!monitor.is_online());

        monitor.set_status(NetworkStatus::Available);
        observer.changed().await.unwrap();
        assert!(observer.borrow_and_update().is_online());

        // same status again: no wakeup pending
        monitor.set_status(NetworkStatus::Available);
        assert!(!observer.has_changed().unwrap());
    }
}
