pub mod error;
pub mod manager;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{QueueError, Result};
pub use manager::{LeaseManager, MAX_ERROR_CHARS};
pub use memory::MemoryQueueStore;
pub use postgres::PgQueueStore;
pub use store::{Filter, Guard, QueueStats, QueueStore, Transition};
