//! Postgres-backed review store.
//!
//! A trigger on `reviews` announces every write on the `review_changes`
//! channel. One background task listens on that channel and refreshes the
//! snapshots of the affected subscriptions, so writes from any server
//! instance reach every listener.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use rrv_core::{Rating, ReviewDraft, ReviewFilter, ReviewRecord, Session};

use crate::store::{ReviewStore, ReviewSubscription, SubscriptionHub};
use crate::StoreError;

pub const CHANGE_CHANNEL: &str = "review_changes";

const RECONNECT_DELAY: Duration = Duration::from_secs(1);

const REVIEW_COLUMNS: &str = "id, place_id, user_id, user_name, user_email, restaurant_name, \
                              rating, title, comment, created_at, updated_at";

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `reviews` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReviewRow {
    pub id: Uuid,
    pub place_id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_email: Option<String>,
    pub restaurant_name: String,
    pub rating: i16,
    pub title: String,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for ReviewRecord {
    type Error = StoreError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        Ok(ReviewRecord {
            id: row.id.to_string(),
            place_id: row.place_id,
            user_id: row.user_id,
            user_name: row.user_name,
            user_email: row.user_email,
            restaurant_name: row.restaurant_name,
            rating: Rating::new(i64::from(row.rating))?,
            title: row.title,
            comment: row.comment,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Payload published by the `notify_review_change` trigger.
#[derive(Debug, Deserialize)]
struct ChangeNotice {
    place_id: String,
    user_id: String,
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

pub struct PgReviewStore {
    pool: PgPool,
    hub: Arc<SubscriptionHub>,
    /// Held across each snapshot query and its publish, so a snapshot read
    /// earlier never overwrites one read later.
    refresh: Arc<Mutex<()>>,
    listener: JoinHandle<()>,
}

impl PgReviewStore {
    /// Starts listening on [`CHANGE_CHANNEL`] and returns the store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlx`] if the listener connection cannot be
    /// established.
    pub async fn connect(pool: PgPool) -> Result<Self, StoreError> {
        let mut listener = PgListener::connect_with(&pool).await?;
        listener.listen(CHANGE_CHANNEL).await?;

        let hub = Arc::new(SubscriptionHub::default());
        let refresh = Arc::new(Mutex::new(()));
        let task = tokio::spawn(listen_for_changes(
            listener,
            pool.clone(),
            Arc::clone(&hub),
            Arc::clone(&refresh),
        ));

        Ok(Self {
            pool,
            hub,
            refresh,
            listener: task,
        })
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<ReviewRow>, StoreError> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Loads `id` and checks `session` owns it.
    async fn fetch_owned(&self, session: &Session, id: &str) -> Result<Uuid, StoreError> {
        let uuid = Uuid::parse_str(id).map_err(|_| StoreError::NotFound)?;
        let row = self.fetch(uuid).await?.ok_or(StoreError::NotFound)?;
        if row.user_id != session.user_id {
            return Err(StoreError::Forbidden);
        }
        Ok(uuid)
    }
}

impl Drop for PgReviewStore {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

impl ReviewStore for PgReviewStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn health(&self) -> Result<(), StoreError> {
        crate::ping(&self.pool).await?;
        Ok(())
    }

    async fn create(
        &self,
        session: &Session,
        place_id: &str,
        draft: ReviewDraft,
    ) -> Result<ReviewRecord, StoreError> {
        let draft = draft.normalized()?;
        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            "INSERT INTO reviews \
                 (id, place_id, user_id, user_name, user_email, restaurant_name, rating, title, comment) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(place_id)
        .bind(&session.user_id)
        .bind(session.author_name())
        .bind(session.email.as_deref())
        .bind(&draft.restaurant_name)
        .bind(i16::from(draft.rating.value()))
        .bind(&draft.title)
        .bind(&draft.comment)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn get(&self, id: &str) -> Result<Option<ReviewRecord>, StoreError> {
        let Ok(uuid) = Uuid::parse_str(id) else {
            return Ok(None);
        };
        self.fetch(uuid).await?.map(ReviewRecord::try_from).transpose()
    }

    async fn update(
        &self,
        session: &Session,
        id: &str,
        draft: ReviewDraft,
    ) -> Result<ReviewRecord, StoreError> {
        let draft = draft.normalized()?;
        let uuid = self.fetch_owned(session, id).await?;

        // The user_id predicate keeps the write owner-only even if the row
        // changed hands between the check and the update.
        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            "UPDATE reviews \
             SET title = $3, comment = $4, rating = $5, restaurant_name = $6, \
                 user_name = $7, updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 \
             RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(uuid)
        .bind(&session.user_id)
        .bind(&draft.title)
        .bind(&draft.comment)
        .bind(i16::from(draft.rating.value()))
        .bind(&draft.restaurant_name)
        .bind(session.author_name())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;

        row.try_into()
    }

    async fn delete(&self, session: &Session, id: &str) -> Result<(), StoreError> {
        let uuid = self.fetch_owned(session, id).await?;
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1 AND user_id = $2")
            .bind(uuid)
            .bind(&session.user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list(&self, filter: &ReviewFilter) -> Result<Vec<ReviewRecord>, StoreError> {
        list_reviews(&self.pool, filter).await
    }

    async fn subscribe(&self, filter: ReviewFilter) -> Result<ReviewSubscription, StoreError> {
        // Join before querying: a write committed after the query is then
        // seen by the listener, which refreshes this filter too.
        let subscription = self.hub.join(filter);
        let _refresh = self.refresh.lock().await;
        let snapshot = list_reviews(&self.pool, subscription.filter()).await?;
        self.hub.publish(subscription.filter(), snapshot);
        Ok(subscription)
    }
}

async fn list_reviews(pool: &PgPool, filter: &ReviewFilter) -> Result<Vec<ReviewRecord>, StoreError> {
    // `column()` returns one of two fixed identifiers, never user input.
    let rows = sqlx::query_as::<_, ReviewRow>(&format!(
        "SELECT {REVIEW_COLUMNS} FROM reviews WHERE {} = $1 ORDER BY created_at DESC, id",
        filter.column()
    ))
    .bind(filter.value())
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(ReviewRecord::try_from).collect()
}

async fn listen_for_changes(
    mut listener: PgListener,
    pool: PgPool,
    hub: Arc<SubscriptionHub>,
    refresh: Arc<Mutex<()>>,
) {
    loop {
        let notification = match listener.recv().await {
            Ok(notification) => notification,
            Err(e) => {
                tracing::warn!(channel = CHANGE_CHANNEL, error = %e, "review listener error");
                tokio::time::sleep(RECONNECT_DELAY).await;
                continue;
            }
        };

        let notice: ChangeNotice = match serde_json::from_str(notification.payload()) {
            Ok(notice) => notice,
            Err(e) => {
                tracing::warn!(
                    channel = CHANGE_CHANNEL,
                    payload = notification.payload(),
                    error = %e,
                    "unreadable review change notice"
                );
                continue;
            }
        };

        let _refresh = refresh.lock().await;
        for filter in hub.affected(&notice.place_id, &notice.user_id) {
            match list_reviews(&pool, &filter).await {
                Ok(snapshot) => hub.publish(&filter, snapshot),
                Err(e) => {
                    tracing::warn!(filter = ?filter, error = %e, "failed to refresh review snapshot");
                }
            }
        }
    }
}
