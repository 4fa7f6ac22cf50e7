//! Transaction persistence owned by the order system.
//!
//! The webhook path relies on `insert_child` being atomic with respect to the
//! "successful purchase child already exists" check: concurrent duplicate
//! deliveries must not both record a success. The Postgres implementation
//! locks the root row for the check-then-insert and the partial unique index
//! on `(parent_id) WHERE kind = 'purchase' AND status = 'success'` backstops
//! anything that slips past it.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::db::models::{NewChild, Transaction, TransactionStatus, TransactionType};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("transaction not found: {0}")]
    NotFound(String),

    #[error("a successful {1:?} child already exists for transaction {0}")]
    SettledChildExists(Uuid, TransactionType),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Looks up a root transaction by its correlation hash.
    async fn find_by_hash(&self, hash: &str) -> Result<Option<Transaction>, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Transaction, StoreError>;

    /// Whether a child of the given kind with status `success` exists under
    /// `parent_id`. This is the idempotency guard the webhook handler checks
    /// before calling out to the processor.
    async fn has_successful_child(
        &self,
        parent_id: Uuid,
        kind: TransactionType,
    ) -> Result<bool, StoreError>;

    /// Records a child transaction under `root`. Must re-check the
    /// successful-child guard atomically with the insert and fail with
    /// `SettledChildExists` if another delivery won the race.
    async fn insert_child(
        &self,
        root: &Transaction,
        child: NewChild,
    ) -> Result<Transaction, StoreError>;

    /// Inserts a root transaction.
    async fn insert(&self, tx: &Transaction) -> Result<Transaction, StoreError>;

    /// Connectivity check for the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Postgres-backed store.
#[derive(Clone)]
pub struct PgTransactionStore {
    pool: PgPool,
}

impl PgTransactionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const INSERT_SQL: &str = r#"
    INSERT INTO transactions (
        id, hash, kind, status, parent_id, amount, currency,
        response, reference, code, message, created_at, updated_at
    ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
    RETURNING *
"#;

#[async_trait]
impl TransactionStore for PgTransactionStore {
    async fn find_by_hash(&self, hash: &str) -> Result<Option<Transaction>, StoreError> {
        let tx = sqlx::query_as::<_, Transaction>("SELECT * FROM transactions WHERE hash = $1")
            .bind(hash)
            .fetch_optional(&self.pool)
            .await?;

        Ok(tx)
    }

    async fn get(&self, id: Uuid) -> Result<Transaction, StoreError> {
        sqlx::query_as::<_, Transaction>("SELECT * FROM transactions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn has_successful_child(
        &self,
        parent_id: Uuid,
        kind: TransactionType,
    ) -> Result<bool, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM transactions WHERE parent_id = $1 AND kind = $2 AND status = $3",
        )
        .bind(parent_id)
        .bind(kind)
        .bind(TransactionStatus::Success)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    async fn insert_child(
        &self,
        root: &Transaction,
        child: NewChild,
    ) -> Result<Transaction, StoreError> {
        let mut db_tx = self.pool.begin().await?;

        // Lock the root row so concurrent deliveries serialize on the
        // check-then-insert.
        sqlx::query("SELECT id FROM transactions WHERE id = $1 FOR UPDATE")
            .bind(root.id)
            .fetch_one(&mut *db_tx)
            .await?;

        let settled: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM transactions WHERE parent_id = $1 AND kind = $2 AND status = $3",
        )
        .bind(root.id)
        .bind(TransactionType::Purchase)
        .bind(TransactionStatus::Success)
        .fetch_one(&mut *db_tx)
        .await?;

        if settled > 0 {
            db_tx.rollback().await?;
            return Err(StoreError::SettledChildExists(
                root.id,
                TransactionType::Purchase,
            ));
        }

        let now = Utc::now();
        let inserted = sqlx::query_as::<_, Transaction>(INSERT_SQL)
            .bind(Uuid::new_v4())
            .bind(Uuid::new_v4().simple().to_string())
            .bind(child.kind)
            .bind(child.status)
            .bind(root.id)
            .bind(&root.amount)
            .bind(&root.currency)
            .bind(&child.response)
            .bind(&child.reference)
            .bind(&child.code)
            .bind(&child.message)
            .bind(now)
            .bind(now)
            .fetch_one(&mut *db_tx)
            .await
            .map_err(|e| {
                if e.as_database_error()
                    .map(|d| d.is_unique_violation())
                    .unwrap_or(false)
                {
                    StoreError::SettledChildExists(root.id, TransactionType::Purchase)
                } else {
                    StoreError::Database(e)
                }
            })?;

        db_tx.commit().await?;
        Ok(inserted)
    }

    async fn insert(&self, tx: &Transaction) -> Result<Transaction, StoreError> {
        let inserted = sqlx::query_as::<_, Transaction>(INSERT_SQL)
            .bind(tx.id)
            .bind(&tx.hash)
            .bind(tx.kind)
            .bind(tx.status)
            .bind(tx.parent_id)
            .bind(&tx.amount)
            .bind(&tx.currency)
            .bind(&tx.response)
            .bind(&tx.reference)
            .bind(&tx.code)
            .bind(&tx.message)
            .bind(tx.created_at)
            .bind(tx.updated_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(inserted)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
