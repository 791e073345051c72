use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use seoforge_common::{Clock, ManualClock, NewWorkItem, WorkStatus};
use seoforge_queue::{LeaseManager, MemoryQueueStore, QueueStats, QueueStore};

fn new_item(keyword: &str) -> NewWorkItem {
    NewWorkItem::new(keyword, "project-1", "google.com", "English")
}

fn lease() -> Duration {
    Duration::minutes(120)
}

#[tokio::test]
async fn claimed_items_are_not_claimable_again() {
    let store = Arc::new(MemoryQueueStore::new());
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let manager = LeaseManager::new(store.clone(), clock.clone());
    for i in 0..3 {
        store.enqueue(new_item(&format!("kw-{i}")), clock.now()).await;
    }

    let first = manager.claim(2, "worker-a", lease()).await.unwrap();
    let second = manager.claim(5, "worker-b", lease()).await.unwrap();
    let third = manager.claim(5, "worker-c", lease()).await.unwrap();

    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 1);
    assert!(third.is_empty());
    assert!(first.iter().all(|i| i.owner.as_deref() == Some("worker-a")));
    assert!(first
        .iter()
        .all(|i| i.status == WorkStatus::Processing && i.attempts == 1));
    assert_eq!(first[0].lease_expiry, Some(clock.now() + lease()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_claims_never_share_an_item() {
    let store = Arc::new(MemoryQueueStore::new());
    let clock = Arc::new(ManualClock::new(Utc::now()));
    for i in 0..20 {
        store.enqueue(new_item(&format!("kw-{i}")), clock.now()).await;
    }

    let claims = (0..8).map(|w| {
        let manager = LeaseManager::new(store.clone(), clock.clone());
        tokio::spawn(async move {
            manager
                .claim(5, &format!("worker-{w}"), lease())
                .await
                .unwrap()
        })
    });
    let results = futures::future::join_all(claims).await;

    let mut seen = HashSet::new();
    for batch in results {
        for item in batch.unwrap() {
            assert!(seen.insert(item.id), "item {} claimed twice", item.id);
        }
    }
    // Demand exceeds supply, so losing a race never leaves an item behind.
    assert_eq!(seen.len(), 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn racing_single_claims_each_get_an_item() {
    let store = Arc::new(MemoryQueueStore::new());
    let clock = Arc::new(ManualClock::new(Utc::now()));
    store.enqueue(new_item("a"), clock.now()).await;
    store.enqueue(new_item("b"), clock.now()).await;

    for _ in 0..50 {
        let claims = ["worker-a", "worker-b"].map(|owner| {
            let manager = LeaseManager::new(store.clone(), clock.clone());
            tokio::spawn(async move { manager.claim(1, owner, lease()).await.unwrap() })
        });
        let [a, b] = claims;
        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
        assert_ne!(a[0].id, b[0].id);

        // Put both back for the next round.
        clock.advance(std::time::Duration::from_secs(121 * 60));
        LeaseManager::new(store.clone(), clock.clone())
            .release_expired()
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn stale_owner_cannot_finish_a_reclaimed_item() {
    let store = Arc::new(MemoryQueueStore::new());
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let manager = LeaseManager::new(store.clone(), clock.clone());
    let item = store.enqueue(new_item("kw"), clock.now()).await;

    manager.claim(1, "worker-a", Duration::minutes(10)).await.unwrap();
    clock.advance(std::time::Duration::from_secs(11 * 60));
    manager.claim(1, "worker-b", Duration::minutes(10)).await.unwrap();

    let updated = manager
        .complete(&[item.id], "worker-a", WorkStatus::Failed, Some("late failure"))
        .await
        .unwrap();
    assert_eq!(updated, 0);

    let current = store.get(item.id).await.unwrap();
    assert_eq!(current.status, WorkStatus::Processing);
    assert_eq!(current.owner.as_deref(), Some("worker-b"));
    assert_eq!(current.error, None);
    let stats = manager.stats().await.unwrap();
    assert_eq!((stats.processing, stats.failed), (1, 0));

    let updated = manager
        .complete(&[item.id], "worker-b", WorkStatus::Completed, None)
        .await
        .unwrap();
    assert_eq!(updated, 1);
    assert_eq!(store.get(item.id).await.unwrap().status, WorkStatus::Completed);
}

#[tokio::test]
async fn expired_lease_is_reclaimed_with_another_attempt() {
    let store = Arc::new(MemoryQueueStore::new());
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let manager = LeaseManager::new(store.clone(), clock.clone());
    let item = store.enqueue(new_item("kw"), clock.now()).await;

    manager.claim(1, "worker-a", Duration::minutes(10)).await.unwrap();
    clock.advance(std::time::Duration::from_secs(11 * 60));

    let reclaimed = manager.claim(1, "worker-b", Duration::minutes(10)).await.unwrap();
    assert_eq!(reclaimed.len(), 1);
    assert_eq!(reclaimed[0].id, item.id);
    assert_eq!(reclaimed[0].owner.as_deref(), Some("worker-b"));
    assert_eq!(reclaimed[0].attempts, 2);
}

#[tokio::test]
async fn live_lease_is_not_reclaimed() {
    let store = Arc::new(MemoryQueueStore::new());
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let manager = LeaseManager::new(store.clone(), clock.clone());
    store.enqueue(new_item("kw"), clock.now()).await;

    manager.claim(1, "worker-a", Duration::minutes(10)).await.unwrap();
    clock.advance(std::time::Duration::from_secs(9 * 60));

    assert!(manager.claim(1, "worker-b", Duration::minutes(10)).await.unwrap().is_empty());
    assert_eq!(manager.release_expired().await.unwrap(), 0);
}

#[tokio::test]
async fn release_expired_returns_items_to_pending() {
    let store = Arc::new(MemoryQueueStore::new());
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let manager = LeaseManager::new(store.clone(), clock.clone());
    let a = store.enqueue(new_item("a"), clock.now()).await;
    store.enqueue(new_item("b"), clock.now()).await;

    manager.claim(1, "worker-a", Duration::minutes(5)).await.unwrap();
    clock.advance(std::time::Duration::from_secs(6 * 60));

    assert_eq!(manager.release_expired().await.unwrap(), 1);
    let released = store.get(a.id).await.unwrap();
    assert_eq!(released.status, WorkStatus::Pending);
    assert_eq!(released.owner, None);
    assert_eq!(released.lease_expiry, None);
    assert_eq!(released.attempts, 1);
}

#[tokio::test]
async fn higher_priority_is_claimed_first() {
    let store = Arc::new(MemoryQueueStore::new());
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let manager = LeaseManager::new(store.clone(), clock.clone());
    store.enqueue(new_item("routine"), clock.now()).await;
    store
        .enqueue(new_item("urgent").with_priority(10), clock.now() + Duration::seconds(1))
        .await;

    let claimed = manager.claim(1, "worker-a", lease()).await.unwrap();
    assert_eq!(claimed[0].keyword, "urgent");
}

#[tokio::test]
async fn stats_reflect_every_state() {
    let store = Arc::new(MemoryQueueStore::new());
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let manager = LeaseManager::new(store.clone(), clock.clone());
    for kw in ["a", "b", "c", "d"] {
        store.enqueue(new_item(kw), clock.now()).await;
    }

    let claimed = manager.claim(3, "worker-a", Duration::minutes(5)).await.unwrap();
    manager
        .complete(&[claimed[0].id], "worker-a", WorkStatus::Completed, None)
        .await
        .unwrap();
    manager
        .complete(&[claimed[1].id], "worker-a", WorkStatus::Failed, Some("engine down"))
        .await
        .unwrap();
    clock.advance(std::time::Duration::from_secs(10 * 60));

    assert_eq!(
        manager.stats().await.unwrap(),
        QueueStats {
            total: 4,
            pending: 1,
            processing: 1,
            expired: 1,
            completed: 1,
            failed: 1,
        }
    );
    assert_eq!(store.stats(clock.now()).await.unwrap().total, 4);
}
