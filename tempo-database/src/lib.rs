pub mod cache;
pub mod database;
pub mod impls;
#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod model;
pub mod store;

pub use cache::CacheService;
pub use database::{Database, MIGRATOR};
#[cfg(any(test, feature = "testing"))]
pub use memory::MemoryStore;
pub use store::{ActivityStore, ConfigStore};
