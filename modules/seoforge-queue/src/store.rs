//! Storage contract for the keyword queue.
//!
//! Every state change goes through `update_if`, which must check the guard
//! and apply the transition atomically. That single primitive is what keeps
//! concurrent claims from handing out the same item twice.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use seoforge_common::{WorkItem, WorkStatus};

use crate::error::Result;

/// Which items `select` returns. Results are ordered by priority (highest
/// first), then creation time, then insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    /// Pending, or processing under an expired lease.
    Claimable { now: DateTime<Utc> },
    /// Processing under an expired lease.
    Expired { now: DateTime<Utc> },
    Status(WorkStatus),
    All,
}

impl Filter {
    pub fn matches(&self, item: &WorkItem) -> bool {
        match self {
            Filter::Claimable { now } => item.is_claimable(*now),
            Filter::Expired { now } => item.lease_expired(*now),
            Filter::Status(status) => item.status == *status,
            Filter::All => true,
        }
    }
}

/// Condition re-checked at update time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    Claimable { now: DateTime<Utc> },
    Expired { now: DateTime<Utc> },
    /// Processing and leased to `owner`. A worker whose lease was taken over
    /// no longer holds the item.
    HeldBy { owner: String },
}

impl Guard {
    pub fn holds(&self, item: &WorkItem) -> bool {
        match self {
            Guard::Claimable { now } => item.is_claimable(*now),
            Guard::Expired { now } => item.lease_expired(*now),
            Guard::HeldBy { owner } => {
                item.status == WorkStatus::Processing && item.owner.as_deref() == Some(owner.as_str())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Take the lease: processing, owner, expiry, one more attempt.
    Claim {
        owner: String,
        lease_expiry: DateTime<Utc>,
    },
    /// Terminal status. Owner and lease are cleared.
    Finish {
        status: WorkStatus,
        error: Option<String>,
        processed_at: DateTime<Utc>,
    },
    /// Back to pending with owner and lease cleared.
    Release,
}

impl Transition {
    pub fn apply(&self, item: &mut WorkItem) {
        match self {
            Transition::Claim {
                owner,
                lease_expiry,
            } => {
                item.status = WorkStatus::Processing;
                item.owner = Some(owner.clone());
                item.lease_expiry = Some(*lease_expiry);
                item.attempts += 1;
            }
            Transition::Finish {
                status,
                error,
                processed_at,
            } => {
                item.status = *status;
                item.owner = None;
                item.lease_expiry = None;
                item.error = error.clone();
                item.processed_at = Some(*processed_at);
            }
            Transition::Release => {
                item.status = WorkStatus::Pending;
                item.owner = None;
                item.lease_expiry = None;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub total: u64,
    pub pending: u64,
    pub processing: u64,
    /// Processing items whose lease has run out. Also counted in `processing`.
    pub expired: u64,
    pub completed: u64,
    pub failed: u64,
}

impl QueueStats {
    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a WorkItem>, now: DateTime<Utc>) -> Self {
        let mut stats = QueueStats::default();
        for item in items {
            stats.total += 1;
            match item.status {
                WorkStatus::Pending => stats.pending += 1,
                WorkStatus::Processing => {
                    stats.processing += 1;
                    if item.lease_expired(now) {
                        stats.expired += 1;
                    }
                }
                WorkStatus::Completed => stats.completed += 1,
                WorkStatus::Failed => stats.failed += 1,
            }
        }
        stats
    }
}

#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Matching items in claim order, at most `limit` when given.
    async fn select(&self, filter: Filter, limit: Option<usize>) -> Result<Vec<WorkItem>>;

    /// Apply `transition` only if `guard` still holds. `None` when it didn't.
    async fn update_if(&self, id: Uuid, guard: Guard, transition: Transition) -> Result<Option<WorkItem>>;

    /// Apply `transition` to every listed item for which `guard` holds.
    /// Returns the number updated.
    async fn update_many(&self, ids: &[Uuid], guard: Guard, transition: Transition) -> Result<u64>;

    async fn stats(&self, now: DateTime<Utc>) -> Result<QueueStats> {
        let items = self.select(Filter::All, None).await?;
        Ok(QueueStats::from_items(&items, now))
    }
}
