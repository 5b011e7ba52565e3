//! PostgreSQL document store (feature `postgres`).
//!
//! Documents live as JSONB in one table keyed by (collection, id).
//! Transactions run at SERIALIZABLE isolation; serialization failures and
//! deadlocks come back as `StoreError::Conflict` so the retry loop reruns
//! the body.
//!
//! This module uses dynamic queries (sqlx::query) instead of compile-time
//! checked macros (sqlx::query!) to allow compilation without DATABASE_URL.

use crate::error::StoreError;
use crate::repository::{DocumentStore, Transaction, DEFAULT_MAX_ATTEMPTS};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::{PgPool, Postgres, Row};
use swapmeet_domain::{
    Exchange, ExchangeId, ExchangeStatus, Item, ItemId, Review, ReviewKey, UserId, UserProfile,
};
use tracing::info;

const ITEMS: &str = "items";
const EXCHANGES: &str = "exchanges";
const REVIEWS: &str = "reviews";
const USERS: &str = "users";

/// Document store backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
    max_attempts: u32,
}

impl PgDocumentStore {
    /// Wrap an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Connect to `database_url` and make sure the table exists.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        info!("Connected to PostgreSQL document store");
        Ok(store)
    }

    /// Override how many times a conflicting transaction is attempted
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Create the documents table and the active-exchange lookup index.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection  TEXT        NOT NULL,
                id          TEXT        NOT NULL,
                body        JSONB       NOT NULL,
                updated_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
                PRIMARY KEY (collection, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS documents_exchange_item_idx
                ON documents ((body->>'itemId'))
                WHERE collection = 'exchanges'
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get a reference to the underlying pool (for testing).
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;
        Ok(Box::new(PgTransaction { tx: Some(tx) }))
    }

    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

struct PgTransaction {
    tx: Option<sqlx::Transaction<'static, Postgres>>,
}

impl PgTransaction {
    fn conn(&mut self) -> Result<&mut sqlx::Transaction<'static, Postgres>, StoreError> {
        self.tx.as_mut().ok_or(StoreError::TransactionClosed)
    }

    async fn get<T: DeserializeOwned>(
        &mut self,
        collection: &'static str,
        id: String,
    ) -> Result<Option<T>, StoreError> {
        let tx = self.conn()?;
        let row = sqlx::query("SELECT body FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?;

        match row {
            Some(row) => {
                let body: serde_json::Value = row.try_get("body")?;
                Ok(Some(serde_json::from_value(body)?))
            },
            None => Ok(None),
        }
    }

    async fn put<T: Serialize + Sync>(
        &mut self,
        collection: &'static str,
        id: String,
        document: &T,
    ) -> Result<(), StoreError> {
        let body = serde_json::to_value(document)?;
        let tx = self.conn()?;
        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, body)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id)
            DO UPDATE SET body = EXCLUDED.body, updated_at = now()
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(body)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Transaction for PgTransaction {
    async fn get_item(&mut self, id: ItemId) -> Result<Option<Item>, StoreError> {
        self.get(ITEMS, id.to_string()).await
    }

    async fn get_exchange(&mut self, id: ExchangeId) -> Result<Option<Exchange>, StoreError> {
        self.get(EXCHANGES, id.to_string()).await
    }

    async fn get_review(&mut self, key: &ReviewKey) -> Result<Option<Review>, StoreError> {
        self.get(REVIEWS, key.document_id()).await
    }

    async fn get_user(&mut self, id: UserId) -> Result<Option<UserProfile>, StoreError> {
        self.get(USERS, id.to_string()).await
    }

    async fn find_active_exchanges_for_item(
        &mut self,
        item_id: ItemId,
    ) -> Result<Vec<Exchange>, StoreError> {
        let active: Vec<String> =
            ExchangeStatus::ACTIVE.iter().map(|s| s.name().to_string()).collect();

        let tx = self.conn()?;
        let rows = sqlx::query(
            r#"
            SELECT body
            FROM documents
            WHERE collection = 'exchanges'
              AND body->>'itemId' = $1
              AND body->>'status' = ANY($2)
            ORDER BY body->>'createdAt', id
            "#,
        )
        .bind(item_id.to_string())
        .bind(active)
        .fetch_all(&mut **tx)
        .await?;

        rows.iter()
            .map(|row| -> Result<Exchange, StoreError> {
                let body: serde_json::Value = row.try_get("body")?;
                Ok(serde_json::from_value(body)?)
            })
            .collect()
    }

    async fn put_item(&mut self, item: &Item) -> Result<(), StoreError> {
        self.put(ITEMS, item.id.to_string(), item).await
    }

    async fn put_exchange(&mut self, exchange: &Exchange) -> Result<(), StoreError> {
        self.put(EXCHANGES, exchange.id.to_string(), exchange).await
    }

    async fn put_review(&mut self, review: &Review) -> Result<(), StoreError> {
        self.put(REVIEWS, review.key().document_id(), review).await
    }

    async fn put_user(&mut self, user: &UserProfile) -> Result<(), StoreError> {
        self.put(USERS, user.id.to_string(), user).await
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        let tx = self.tx.take().ok_or(StoreError::TransactionClosed)?;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        match self.tx.take() {
            Some(tx) => Ok(tx.rollback().await?),
            None => Ok(()),
        }
    }
}

// =============================================================================
// Tests (require a running PostgreSQL, see DATABASE_URL)
// =============================================================================
