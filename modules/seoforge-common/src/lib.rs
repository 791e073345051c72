pub mod clock;
pub mod config;
pub mod error;
pub mod types;

pub use clock::{Clock, SystemClock};
#[cfg(any(test, feature = "test-support"))]
pub use clock::ManualClock;
pub use config::Config;
pub use error::PipelineError;
pub use types::*;
