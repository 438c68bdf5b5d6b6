pub mod cache;
pub mod config;
pub mod connectivity;
pub mod models;
pub mod remote;
pub mod schema;
pub mod sync;

pub use cache::NotificationCache;
pub use config::AppConfig;
pub use connectivity::{CallbackMonitor, ConnectivityMonitor, HttpProbeMonitor, NetworkStatus};
pub use remote::{HttpRemoteStore, RemoteNotificationStore};
pub use sync::{
    BackoffPolicy, JobState, MutationQueue, PendingOp, SyncCoordinator, SyncWorker,
    TokioScheduler, WorkOutcome, WorkRequest, WorkScheduler, Worker, SYNC_WORK_NAME,
};
