//! Record storage
//!
//! Handlers talk to these traits; the in-memory implementations keep the
//! records in `RwLock<HashMap>`s for the lifetime of the process.

pub mod users;
pub mod videos;

pub use self::users::{InMemoryUserStore, NewUser, User, UserStore};
pub use self::videos::{InMemoryVideoStore, NewVideo, Video, VideoStore};
