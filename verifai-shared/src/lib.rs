pub mod errors;
pub mod telemetry;
pub mod types;

pub use errors::{ErrorKind, SyncError, SyncResult};
pub use types::*;
