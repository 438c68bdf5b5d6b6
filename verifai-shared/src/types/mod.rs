pub mod auth;
pub mod notification;
pub mod pagination;

pub use auth::*;
pub use notification::*;
pub use pagination::*;
