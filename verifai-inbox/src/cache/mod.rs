mod live;
mod store;

pub use store::{CachePool, NotificationCache};
