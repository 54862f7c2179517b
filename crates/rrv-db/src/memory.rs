use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use rrv_core::{sort_newest_first, ReviewDraft, ReviewFilter, ReviewRecord, Session};

use crate::store::{ReviewStore, ReviewSubscription, SubscriptionHub};
use crate::StoreError;

/// In-process review store used when no database is configured and in tests.
#[derive(Debug, Default)]
pub struct MemoryReviewStore {
    reviews: RwLock<HashMap<String, ReviewRecord>>,
    hub: SubscriptionHub,
}

impl MemoryReviewStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(reviews: &HashMap<String, ReviewRecord>, filter: &ReviewFilter) -> Vec<ReviewRecord> {
        let mut matching: Vec<ReviewRecord> = reviews
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        sort_newest_first(&mut matching);
        matching
    }

    /// Pushes fresh snapshots to every listener affected by `review`.
    ///
    /// Called while the write lock is held so snapshots are published in
    /// commit order.
    fn notify(&self, reviews: &HashMap<String, ReviewRecord>, review: &ReviewRecord) {
        for filter in self.hub.affected(&review.place_id, &review.user_id) {
            self.hub.publish(&filter, Self::snapshot(reviews, &filter));
        }
    }
}

impl ReviewStore for MemoryReviewStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn health(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn create(
        &self,
        session: &Session,
        place_id: &str,
        draft: ReviewDraft,
    ) -> Result<ReviewRecord, StoreError> {
        let draft = draft.normalized()?;
        let now = Utc::now();
        let review = ReviewRecord {
            id: Uuid::new_v4().to_string(),
            place_id: place_id.to_string(),
            user_id: session.user_id.clone(),
            user_name: session.author_name().to_string(),
            user_email: session.email.clone(),
            restaurant_name: draft.restaurant_name,
            rating: draft.rating,
            title: draft.title,
            comment: draft.comment,
            created_at: now,
            updated_at: now,
        };

        let mut reviews = self.reviews.write().await;
        reviews.insert(review.id.clone(), review.clone());
        self.notify(&reviews, &review);
        Ok(review)
    }

    async fn get(&self, id: &str) -> Result<Option<ReviewRecord>, StoreError> {
        Ok(self.reviews.read().await.get(id).cloned())
    }

    async fn update(
        &self,
        session: &Session,
        id: &str,
        draft: ReviewDraft,
    ) -> Result<ReviewRecord, StoreError> {
        let draft = draft.normalized()?;
        let mut reviews = self.reviews.write().await;
        let review = reviews.get_mut(id).ok_or(StoreError::NotFound)?;
        if !review.is_owned_by(session) {
            return Err(StoreError::Forbidden);
        }

        review.title = draft.title;
        review.comment = draft.comment;
        review.rating = draft.rating;
        review.restaurant_name = draft.restaurant_name;
        review.user_name = session.author_name().to_string();
        review.updated_at = Utc::now();
        let updated = review.clone();

        self.notify(&reviews, &updated);
        Ok(updated)
    }

    async fn delete(&self, session: &Session, id: &str) -> Result<(), StoreError> {
        let mut reviews = self.reviews.write().await;
        let review = reviews.get(id).ok_or(StoreError::NotFound)?;
        if !review.is_owned_by(session) {
            return Err(StoreError::Forbidden);
        }
        if let Some(removed) = reviews.remove(id) {
            self.notify(&reviews, &removed);
        }
        Ok(())
    }

    async fn list(&self, filter: &ReviewFilter) -> Result<Vec<ReviewRecord>, StoreError> {
        Ok(Self::snapshot(&*self.reviews.read().await, filter))
    }

    async fn subscribe(&self, filter: ReviewFilter) -> Result<ReviewSubscription, StoreError> {
        // Hold the read lock so no write can slip between snapshot and join.
        let reviews = self.reviews.read().await;
        let initial = Self::snapshot(&reviews, &filter);
        Ok(self.hub.subscribe(filter, initial))
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
