//! The review store gateway and its live subscriptions.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, PoisonError};

use futures::Stream;
use tokio::sync::watch;

use rrv_core::{ReviewDraft, ReviewFilter, ReviewRecord, Session};

use crate::StoreError;

/// Persistence and change feed for reviews.
///
/// Writes take the acting [`Session`]. Only the author of a review may
/// update or delete it.
pub trait ReviewStore: Send + Sync {
    /// Short backend label reported by health checks.
    fn backend_name(&self) -> &'static str;

    /// Verifies the backend is reachable.
    fn health(&self) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Stores a new review for `place_id` authored by `session`.
    ///
    /// The store assigns the id and sets `created_at == updated_at == now`.
    fn create(
        &self,
        session: &Session,
        place_id: &str,
        draft: ReviewDraft,
    ) -> impl Future<Output = Result<ReviewRecord, StoreError>> + Send;

    fn get(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<ReviewRecord>, StoreError>> + Send;

    /// Overwrites title, comment, rating, restaurant name and author name,
    /// and bumps `updated_at`.
    fn update(
        &self,
        session: &Session,
        id: &str,
        draft: ReviewDraft,
    ) -> impl Future<Output = Result<ReviewRecord, StoreError>> + Send;

    fn delete(
        &self,
        session: &Session,
        id: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Reviews matching `filter`, newest first.
    fn list(
        &self,
        filter: &ReviewFilter,
    ) -> impl Future<Output = Result<Vec<ReviewRecord>, StoreError>> + Send;

    /// Live view of [`ReviewStore::list`] for `filter`.
    fn subscribe(
        &self,
        filter: ReviewFilter,
    ) -> impl Future<Output = Result<ReviewSubscription, StoreError>> + Send;
}

/// A cancellable feed of ordered review snapshots.
///
/// The first [`next`](Self::next) resolves immediately with the current
/// snapshot; later calls wait for the next change. Dropping the value
/// releases the listener.
#[derive(Debug)]
pub struct ReviewSubscription {
    filter: ReviewFilter,
    receiver: watch::Receiver<Vec<ReviewRecord>>,
    primed: bool,
}

impl ReviewSubscription {
    pub(crate) fn new(filter: ReviewFilter, receiver: watch::Receiver<Vec<ReviewRecord>>) -> Self {
        Self {
            filter,
            receiver,
            primed: false,
        }
    }

    #[must_use]
    pub fn filter(&self) -> &ReviewFilter {
        &self.filter
    }

    /// The next snapshot, or `None` once the store has shut down.
    pub async fn next(&mut self) -> Option<Vec<ReviewRecord>> {
        if !self.primed {
            self.primed = true;
            return Some(self.receiver.borrow_and_update().clone());
        }
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Stops listening. Equivalent to dropping the subscription.
    pub fn unsubscribe(self) {
        tracing::debug!(filter = ?self.filter, "review subscription released");
    }

    /// Adapts the subscription into a [`Stream`] of snapshots.
    pub fn into_stream(self) -> impl Stream<Item = Vec<ReviewRecord>> + Send {
        futures::stream::unfold(self, |mut sub| async move {
            let snapshot = sub.next().await?;
            Some((snapshot, sub))
        })
    }
}

/// Fan-out registry holding one watch channel per subscribed filter.
#[derive(Debug, Default)]
pub(crate) struct SubscriptionHub {
    senders: Mutex<HashMap<ReviewFilter, watch::Sender<Vec<ReviewRecord>>>>,
}

impl SubscriptionHub {
    /// Registers a listener for `filter`, opening an empty channel when
    /// none exists. Once joined, `filter` is reported by
    /// [`affected`](Self::affected).
    pub(crate) fn join(&self, filter: ReviewFilter) -> ReviewSubscription {
        let mut senders = self.senders.lock().unwrap_or_else(PoisonError::into_inner);
        let receiver = match senders.get(&filter) {
            Some(sender) if !sender.is_closed() => sender.subscribe(),
            _ => {
                let (sender, receiver) = watch::channel(Vec::new());
                senders.insert(filter.clone(), sender);
                receiver
            }
        };
        ReviewSubscription::new(filter, receiver)
    }

    /// Joins `filter` and makes `current` the channel's value, replacing
    /// whatever an existing channel last held.
    pub(crate) fn subscribe(
        &self,
        filter: ReviewFilter,
        current: Vec<ReviewRecord>,
    ) -> ReviewSubscription {
        let subscription = self.join(filter);
        self.publish(subscription.filter(), current);
        subscription
    }

    /// Filters with live listeners that a change to a review of
    /// `place_id` by `user_id` affects. Channels nobody listens to any more
    /// are pruned.
    pub(crate) fn affected(&self, place_id: &str, user_id: &str) -> Vec<ReviewFilter> {
        let mut senders = self.senders.lock().unwrap_or_else(PoisonError::into_inner);
        senders.retain(|_, sender| !sender.is_closed());
        senders
            .keys()
            .filter(|filter| match filter {
                ReviewFilter::ByRestaurant(p) => p == place_id,
                ReviewFilter::ByUser(u) => u == user_id,
            })
            .cloned()
            .collect()
    }

    /// Replaces the snapshot for `filter`. Listeners are woken only when it
    /// differs from the one they already hold.
    pub(crate) fn publish(&self, filter: &ReviewFilter, snapshot: Vec<ReviewRecord>) {
        let senders = self.senders.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(sender) = senders.get(filter) {
            sender.send_if_modified(|current| {
                if *current == snapshot {
                    return false;
                }
                *current = snapshot;
                true
            });
        }
    }

    #[cfg(test)]
    pub(crate) fn channel_count(&self) -> usize {
        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
