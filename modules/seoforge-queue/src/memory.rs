use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use seoforge_common::{NewWorkItem, WorkItem};

use crate::error::Result;
use crate::store::{Filter, Guard, QueueStore, Transition};

/// In-process queue. The mutex makes each `update_if` atomic.
#[derive(Default)]
pub struct MemoryQueueStore {
    items: Mutex<Vec<WorkItem>>,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn enqueue(&self, new: NewWorkItem, now: DateTime<Utc>) -> WorkItem {
        let item = WorkItem::new(new, now);
        self.items.lock().await.push(item.clone());
        item
    }

    /// Insert an item as is, e.g. one restored from elsewhere.
    pub async fn insert(&self, item: WorkItem) {
        self.items.lock().await.push(item);
    }

    pub async fn get(&self, id: Uuid) -> Option<WorkItem> {
        self.items.lock().await.iter().find(|i| i.id == id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn select(&self, filter: Filter, limit: Option<usize>) -> Result<Vec<WorkItem>> {
        let items = self.items.lock().await;
        let mut matched: Vec<WorkItem> = items.iter().filter(|i| filter.matches(i)).cloned().collect();
        // Stable: insertion order breaks remaining ties.
        matched.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        if let Some(limit) = limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    async fn update_if(&self, id: Uuid, guard: Guard, transition: Transition) -> Result<Option<WorkItem>> {
        let mut items = self.items.lock().await;
        let Some(item) = items.iter_mut().find(|i| i.id == id) else {
            return Ok(None);
        };
        if !guard.holds(item) {
            return Ok(None);
        }
        transition.apply(item);
        Ok(Some(item.clone()))
    }

    async fn update_many(&self, ids: &[Uuid], guard: Guard, transition: Transition) -> Result<u64> {
        let mut items = self.items.lock().await;
        let mut updated = 0;
        for item in items.iter_mut().filter(|i| ids.contains(&i.id) && guard.holds(i)) {
            transition.apply(item);
            updated += 1;
        }
        Ok(updated)
    }
}
