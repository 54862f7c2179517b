use rrv_core::{AppConfig, ReviewDraft, ReviewFilter, ReviewRecord, Session};

use crate::memory::MemoryReviewStore;
use crate::postgres::PgReviewStore;
use crate::store::{ReviewStore, ReviewSubscription};
use crate::{connect_pool_from_config, run_migrations, StoreError};

/// The review store selected at startup.
///
/// Postgres when `DATABASE_URL` is configured, otherwise in-memory.
pub enum ReviewBackend {
    Memory(MemoryReviewStore),
    Postgres(PgReviewStore),
}

impl ReviewBackend {
    /// Connects to Postgres and applies pending migrations when a database
    /// is configured, else falls back to memory.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if a configured database cannot be reached or
    /// migrated.
    pub async fn from_config(config: &AppConfig) -> Result<Self, StoreError> {
        if config.database_url.is_none() {
            tracing::warn!("DATABASE_URL not set; reviews are kept in memory only");
            return Ok(Self::Memory(MemoryReviewStore::new()));
        }
        let pool = connect_pool_from_config(config).await?;
        let applied = run_migrations(&pool).await?;
        tracing::info!(applied, "database migrations complete");
        Ok(Self::Postgres(PgReviewStore::connect(pool).await?))
    }
}

impl From<MemoryReviewStore> for ReviewBackend {
    fn from(store: MemoryReviewStore) -> Self {
        Self::Memory(store)
    }
}

impl ReviewStore for ReviewBackend {
    fn backend_name(&self) -> &'static str {
        match self {
            Self::Memory(s) => s.backend_name(),
            Self::Postgres(s) => s.backend_name(),
        }
    }

    async fn health(&self) -> Result<(), StoreError> {
        match self {
            Self::Memory(s) => s.health().await,
            Self::Postgres(s) => s.health().await,
        }
    }

    async fn create(
        &self,
        session: &Session,
        place_id: &str,
        draft: ReviewDraft,
    ) -> Result<ReviewRecord, StoreError> {
        match self {
            Self::Memory(s) => s.create(session, place_id, draft).await,
            Self::Postgres(s) => s.create(session, place_id, draft).await,
        }
    }

    async fn get(&self, id: &str) -> Result<Option<ReviewRecord>, StoreError> {
        match self {
            Self::Memory(s) => s.get(id).await,
            Self::Postgres(s) => s.get(id).await,
        }
    }

    async fn update(
        &self,
        session: &Session,
        id: &str,
        draft: ReviewDraft,
    ) -> Result<ReviewRecord, StoreError> {
        match self {
            Self::Memory(s) => s.update(session, id, draft).await,
            Self::Postgres(s) => s.update(session, id, draft).await,
        }
    }

    async fn delete(&self, session: &Session, id: &str) -> Result<(), StoreError> {
        match self {
            Self::Memory(s) => s.delete(session, id).await,
            Self::Postgres(s) => s.delete(session, id).await,
        }
    }

    async fn list(&self, filter: &ReviewFilter) -> Result<Vec<ReviewRecord>, StoreError> {
        match self {
            Self::Memory(s) => s.list(filter).await,
            Self::Postgres(s) => s.list(filter).await,
        }
    }

    async fn subscribe(&self, filter: ReviewFilter) -> Result<ReviewSubscription, StoreError> {
        match self {
            Self::Memory(s) => s.subscribe(filter).await,
            Self::Postgres(s) => s.subscribe(filter).await,
        }
    }
}
