use std::time::Duration;

use rrv_core::Rating;

use super::*;

fn alice() -> Session {
    Session::new("alice-uid")
        .with_display_name("Alice")
        .with_email("alice@example.com")
}

fn bob() -> Session {
    Session::new("bob-uid").with_email("bob@example.com")
}

fn draft(title: &str, rating: i64) -> ReviewDraft {
    ReviewDraft {
        title: title.to_string(),
        comment: "Solid food and friendly staff.".to_string(),
        rating: Rating::new(rating).expect("valid rating"),
        restaurant_name: "Sky Restaurant".to_string(),
    }
}

/// Waits for the next snapshot, failing the test instead of hanging.
async fn next_snapshot(sub: &mut ReviewSubscription) -> Vec<ReviewRecord> {
    tokio::time::timeout(Duration::from_secs(2), sub.next())
        .await
        .expect("timed out waiting for snapshot")
        .expect("subscription closed")
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_assigns_id_and_timestamps() {
    let store = MemoryReviewStore::new();
    let review = store
        .create(&alice(), "osm-1", draft("Great", 5))
        .await
        .expect("create");

    assert!(!review.id.is_empty());
    assert_eq!(review.place_id, "osm-1");
    assert_eq!(review.user_id, "alice-uid");
    assert_eq!(review.user_name, "Alice");
    assert_eq!(review.user_email.as_deref(), Some("alice@example.com"));
    assert_eq!(review.created_at, review.updated_at);

    let fetched = store.get(&review.id).await.expect("get");
    assert_eq!(fetched, Some(review));
}

#[tokio::test]
async fn create_rejects_invalid_draft() {
    let store = MemoryReviewStore::new();
    let mut bad = draft("Short", 4);
    bad.comment = "meh".to_string();
    let result = store.create(&alice(), "osm-1", bad).await;
    assert!(matches!(result, Err(StoreError::Validation(_))));
    assert!(store
        .list(&ReviewFilter::ByRestaurant("osm-1".to_string()))
        .await
        .expect("list")
        .is_empty());
}

#[tokio::test]
async fn author_name_falls_back_to_email() {
    let store = MemoryReviewStore::new();
    let review = store
        .create(&bob(), "osm-1", draft("Fine", 3))
        .await
        .expect("create");
    assert_eq!(review.user_name, "bob@example.com");
}

#[tokio::test]
async fn owner_can_update_and_timestamp_moves() {
    let store = MemoryReviewStore::new();
    let review = store
        .create(&alice(), "osm-1", draft("Great", 5))
        .await
        .expect("create");

    let updated = store
        .update(&alice(), &review.id, draft("Still great", 4))
        .await
        .expect("update");

    assert_eq!(updated.id, review.id);
    assert_eq!(updated.title, "Still great");
    assert_eq!(updated.rating.value(), 4);
    assert_eq!(updated.created_at, review.created_at);
    assert!(updated.updated_at >= review.updated_at);
}

#[tokio::test]
async fn non_owner_update_and_delete_are_forbidden() {
    let store = MemoryReviewStore::new();
    let review = store
        .create(&alice(), "osm-1", draft("Great", 5))
        .await
        .expect("create");

    let update = store.update(&bob(), &review.id, draft("Hijacked", 1)).await;
    assert!(matches!(update, Err(StoreError::Forbidden)));

    let delete = store.delete(&bob(), &review.id).await;
    assert!(matches!(delete, Err(StoreError::Forbidden)));

    let unchanged = store.get(&review.id).await.expect("get").expect("present");
    assert_eq!(unchanged.title, "Great");
}

#[tokio::test]
async fn unknown_id_is_not_found() {
    let store = MemoryReviewStore::new();
    assert!(matches!(
        store.update(&alice(), "missing", draft("X", 3)).await,
        Err(StoreError::NotFound)
    ));
    assert!(matches!(
        store.delete(&alice(), "missing").await,
        Err(StoreError::NotFound)
    ));
    assert!(store.get("missing").await.expect("get").is_none());
}

#[tokio::test]
async fn owner_can_delete() {
    let store = MemoryReviewStore::new();
    let review = store
        .create(&alice(), "osm-1", draft("Great", 5))
        .await
        .expect("create");
    store.delete(&alice(), &review.id).await.expect("delete");
    assert!(store.get(&review.id).await.expect("get").is_none());
}

#[tokio::test]
async fn list_filters_and_orders_newest_first() {
    let store = MemoryReviewStore::new();
    let first = store
        .create(&alice(), "osm-1", draft("First", 5))
        .await
        .expect("create");
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = store
        .create(&bob(), "osm-1", draft("Second", 3))
        .await
        .expect("create");
    store
        .create(&alice(), "osm-2", draft("Elsewhere", 4))
        .await
        .expect("create");

    let by_place = store
        .list(&ReviewFilter::ByRestaurant("osm-1".to_string()))
        .await
        .expect("list");
    let ids: Vec<&str> = by_place.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec![second.id.as_str(), first.id.as_str()]);

    let by_user = store
        .list(&ReviewFilter::ByUser("alice-uid".to_string()))
        .await
        .expect("list");
    assert_eq!(by_user.len(), 2);
    assert!(by_user.iter().all(|r| r.user_id == "alice-uid"));
}

// ---------------------------------------------------------------------------
// Subscriptions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn subscription_emits_initial_snapshot_then_every_change() {
    let store = MemoryReviewStore::new();
    let existing = store
        .create(&alice(), "osm-1", draft("Existing", 4))
        .await
        .expect("create");

    let mut sub = store
        .subscribe(ReviewFilter::ByRestaurant("osm-1".to_string()))
        .await
        .expect("subscribe");
    assert_eq!(next_snapshot(&mut sub).await, vec![existing.clone()]);

    let created = store
        .create(&bob(), "osm-1", draft("New one", 2))
        .await
        .expect("create");
    let snapshot = next_snapshot(&mut sub).await;
    assert_eq!(snapshot.len(), 2);
    assert!(snapshot.iter().any(|r| r.id == created.id));

    store
        .update(&bob(), &created.id, draft("Edited", 3))
        .await
        .expect("update");
    let snapshot = next_snapshot(&mut sub).await;
    assert!(snapshot.iter().any(|r| r.title == "Edited"));

    store.delete(&alice(), &existing.id).await.expect("delete");
    let snapshot = next_snapshot(&mut sub).await;
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].id, created.id);
}

#[tokio::test]
async fn user_subscription_ignores_other_users() {
    let store = MemoryReviewStore::new();
    let mut sub = store
        .subscribe(ReviewFilter::ByUser("alice-uid".to_string()))
        .await
        .expect("subscribe");
    assert!(next_snapshot(&mut sub).await.is_empty());

    store
        .create(&bob(), "osm-1", draft("Bob's", 3))
        .await
        .expect("create");
    let pending = tokio::time::timeout(Duration::from_millis(50), sub.next()).await;
    assert!(pending.is_err(), "no snapshot expected for another user's review");

    store
        .create(&alice(), "osm-1", draft("Alice's", 5))
        .await
        .expect("create");
    let snapshot = next_snapshot(&mut sub).await;
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].user_id, "alice-uid");
}

#[tokio::test]
async fn unsubscribe_releases_channel() {
    let store = MemoryReviewStore::new();
    let sub = store
        .subscribe(ReviewFilter::ByRestaurant("osm-1".to_string()))
        .await
        .expect("subscribe");
    assert_eq!(store.hub.channel_count(), 1);

    sub.unsubscribe();
    store
        .create(&alice(), "osm-1", draft("After", 5))
        .await
        .expect("create");
    assert_eq!(store.hub.channel_count(), 0);
}

#[tokio::test]
async fn stream_adapter_yields_snapshots() {
    use futures::StreamExt;

    let store = MemoryReviewStore::new();
    let sub = store
        .subscribe(ReviewFilter::ByRestaurant("osm-9".to_string()))
        .await
        .expect("subscribe");
    let mut stream = Box::pin(sub.into_stream());

    assert_eq!(stream.next().await, Some(Vec::new()));
    store
        .create(&alice(), "osm-9", draft("Streamed", 5))
        .await
        .expect("create");
    let snapshot = tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .expect("timed out")
        .expect("stream ended");
    assert_eq!(snapshot.len(), 1);
}
