use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use seoforge_common::{Clock, WorkItem, WorkStatus};

use crate::error::{QueueError, Result};
use crate::store::{Filter, Guard, QueueStats, QueueStore, Transition};

/// Stored failure messages are cut to this many characters.
pub const MAX_ERROR_CHARS: usize = 500;

/// Claims, completes and recovers work items on top of a `QueueStore`.
#[derive(Clone)]
pub struct LeaseManager {
    store: Arc<dyn QueueStore>,
    clock: Arc<dyn Clock>,
}

impl LeaseManager {
    pub fn new(store: Arc<dyn QueueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &Arc<dyn QueueStore> {
        &self.store
    }

    /// Lease up to `limit` claimable items to `owner`. Items another worker
    /// takes between the read and the update are skipped and the read is
    /// repeated, so a lost race only shortens the batch when nothing else
    /// is claimable.
    pub async fn claim(
        &self,
        limit: usize,
        owner: &str,
        lease: chrono::Duration,
    ) -> Result<Vec<WorkItem>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        if lease <= chrono::Duration::zero() {
            return Err(QueueError::InvalidLease(format!("lease must be positive, got {lease}")));
        }
        let now = self.clock.now();
        let lease_expiry = now
            .checked_add_signed(lease)
            .ok_or_else(|| QueueError::InvalidLease(format!("lease of {lease} overflows")))?;

        let mut claimed = Vec::with_capacity(limit);
        let mut attempted: HashSet<Uuid> = HashSet::new();
        while claimed.len() < limit {
            // Over-fetch by the ids already tried so those never crowd out fresh candidates.
            let fetch = limit - claimed.len() + attempted.len();
            let candidates: Vec<WorkItem> = self
                .store
                .select(Filter::Claimable { now }, Some(fetch))
                .await?
                .into_iter()
                .filter(|c| !attempted.contains(&c.id))
                .collect();
            if candidates.is_empty() {
                break;
            }

            for candidate in candidates {
                if claimed.len() == limit {
                    break;
                }
                attempted.insert(candidate.id);
                let transition = Transition::Claim {
                    owner: owner.to_string(),
                    lease_expiry,
                };
                match self
                    .store
                    .update_if(candidate.id, Guard::Claimable { now }, transition)
                    .await?
                {
                    Some(item) => claimed.push(item),
                    None => debug!(item_id = %candidate.id, owner, "Item claimed elsewhere, skipping"),
                }
            }
        }

        if !claimed.is_empty() {
            info!(owner, count = claimed.len(), "Claimed work items");
        }
        Ok(claimed)
    }

    /// Finish items `owner` still holds with a terminal status. Failures keep
    /// a truncated error; completions clear any earlier one. Items whose
    /// lease was taken over by another worker are left alone and not counted.
    pub async fn complete(
        &self,
        ids: &[Uuid],
        owner: &str,
        status: WorkStatus,
        error: Option<&str>,
    ) -> Result<u64> {
        if !status.is_terminal() {
            return Err(QueueError::InvalidStatus(format!(
                "{status} is not a terminal status"
            )));
        }
        let error = match status {
            WorkStatus::Failed => error.map(truncate_error),
            _ => None,
        };
        let updated = self
            .store
            .update_many(
                ids,
                Guard::HeldBy {
                    owner: owner.to_string(),
                },
                Transition::Finish {
                    status,
                    error,
                    processed_at: self.clock.now(),
                },
            )
            .await?;
        if (updated as usize) < ids.len() {
            warn!(
                owner,
                requested = ids.len(),
                updated,
                "Some items are no longer held by this owner and were not finished"
            );
        }
        debug!(count = updated, status = %status, "Work items finished");
        Ok(updated)
    }

    /// Return items whose lease ran out to pending.
    pub async fn release_expired(&self) -> Result<usize> {
        let now = self.clock.now();
        let expired = self.store.select(Filter::Expired { now }, None).await?;

        let mut released = 0;
        for item in expired {
            if self
                .store
                .update_if(item.id, Guard::Expired { now }, Transition::Release)
                .await?
                .is_some()
            {
                warn!(
                    item_id = %item.id,
                    keyword = item.keyword.as_str(),
                    previous_owner = item.owner.as_deref().unwrap_or("<none>"),
                    "Lease expired, item released"
                );
                released += 1;
            }
        }
        Ok(released)
    }

    pub async fn stats(&self) -> Result<QueueStats> {
        self.store.stats(self.clock.now()).await
    }
}

fn truncate_error(error: &str) -> String {
    error.chars().take(MAX_ERROR_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use seoforge_common::{ManualClock, NewWorkItem};

    use crate::memory::MemoryQueueStore;

    fn setup() -> (Arc<MemoryQueueStore>, Arc<ManualClock>, LeaseManager) {
        let store = Arc::new(MemoryQueueStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let manager = LeaseManager::new(store.clone(), clock.clone());
        (store, clock, manager)
    }

    fn new_item(keyword: &str) -> NewWorkItem {
        NewWorkItem::new(keyword, "p", "google.com", "English")
    }

    #[tokio::test]
    async fn failure_error_is_truncated_and_lease_cleared() {
        let (store, clock, manager) = setup();
        let lease = chrono::Duration::minutes(5);
        let item = store.enqueue(new_item("kw"), clock.now()).await;
        manager.claim(1, "w1", lease).await.unwrap();

        let long = "x".repeat(800);
        manager
            .complete(&[item.id], "w1", WorkStatus::Failed, Some(long.as_str()))
            .await
            .unwrap();
        let failed = store.get(item.id).await.unwrap();
        assert_eq!(failed.error.as_ref().map(|e| e.chars().count()), Some(MAX_ERROR_CHARS));
        assert_eq!(failed.owner, None);
        assert!(failed.processed_at.is_some());
    }

    #[tokio::test]
    async fn success_clears_an_earlier_error() {
        let (store, clock, manager) = setup();
        let mut item = WorkItem::new(new_item("kw"), clock.now());
        item.status = WorkStatus::Processing;
        item.owner = Some("w1".into());
        item.lease_expiry = Some(clock.now() + chrono::Duration::minutes(5));
        item.error = Some("engine down".into());
        store.insert(item.clone()).await;

        let updated = manager
            .complete(&[item.id], "w1", WorkStatus::Completed, Some("ignored"))
            .await
            .unwrap();
        assert_eq!(updated, 1);
        let done = store.get(item.id).await.unwrap();
        assert_eq!(done.status, WorkStatus::Completed);
        assert_eq!(done.error, None);
    }

    #[tokio::test]
    async fn claim_rejects_non_positive_and_overflowing_leases() {
        let (store, clock, manager) = setup();
        store.enqueue(new_item("kw"), clock.now()).await;

        let zero = manager.claim(1, "w1", chrono::Duration::zero()).await.unwrap_err();
        assert!(matches!(zero, QueueError::InvalidLease(_)));
        let huge = manager.claim(1, "w1", chrono::Duration::MAX).await.unwrap_err();
        assert!(matches!(huge, QueueError::InvalidLease(_)));
        assert_eq!(store.select(Filter::Status(WorkStatus::Pending), None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn complete_rejects_non_terminal_status() {
        let (_, _, manager) = setup();
        let err = manager.complete(&[], "w1", WorkStatus::Pending, None).await.unwrap_err();
        assert!(matches!(err, QueueError::InvalidStatus(_)));
    }

    #[test]
    fn truncation_respects_multibyte_characters() {
        let text = "é".repeat(600);
        assert_eq!(truncate_error(&text).chars().count(), MAX_ERROR_CHARS);
    }
}
