pub mod publisher;
pub mod worker;

pub use publisher::{LogPublisher, Publisher};
pub use worker::{CycleStats, Worker, WorkerDeps};
