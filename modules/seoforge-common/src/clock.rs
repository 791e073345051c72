use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Time source and sleeper. Injected so polling and lease logic can run without real waits.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    async fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `tokio::time`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use manual::ManualClock;

#[cfg(any(test, feature = "test-support"))]
mod manual {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use super::Clock;

    /// Test clock. `sleep` advances time instantly and records the requested duration.
    pub struct ManualClock {
        inner: Mutex<ManualClockInner>,
    }

    struct ManualClockInner {
        now: DateTime<Utc>,
        sleeps: Vec<Duration>,
    }

    impl ManualClock {
        pub fn new(start: DateTime<Utc>) -> Self {
            Self {
                inner: Mutex::new(ManualClockInner {
                    now: start,
                    sleeps: Vec::new(),
                }),
            }
        }

        pub fn advance(&self, duration: Duration) {
            let mut inner = self.inner.lock().unwrap();
            inner.now += chrono::Duration::from_std(duration).unwrap();
        }

        pub fn set(&self, now: DateTime<Utc>) {
            self.inner.lock().unwrap().now = now;
        }

        /// Every duration passed to `sleep`, in order.
        pub fn sleeps(&self) -> Vec<Duration> {
            self.inner.lock().unwrap().sleeps.clone()
        }

        pub fn total_slept(&self) -> Duration {
            self.sleeps().iter().sum()
        }
    }

    impl Default for ManualClock {
        fn default() -> Self {
            Self::new(Utc::now())
        }
    }

    #[async_trait]
    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            self.inner.lock().unwrap().now
        }

        async fn sleep(&self, duration: Duration) {
            let mut inner = self.inner.lock().unwrap();
            inner.sleeps.push(duration);
            inner.now += chrono::Duration::from_std(duration).unwrap();
        }
    }
}
