//! Transaction entity as persisted by the order system.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Kind of transaction. The reconciler only acts on purchases and refunds;
/// the other variants exist because the order system records them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Purchase,
    Refund,
    Capture,
    Authorize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Processing,
    Success,
    Failed,
}

/// A transaction record. Roots are created by the order system when an
/// outbound request is first sent; children are created by the reconciler
/// in response to processor status updates and point back via `parent_id`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    /// Correlation token embedded in outbound requests and echoed back by
    /// the processor on webhook calls.
    pub hash: String,
    pub kind: TransactionType,
    pub status: TransactionStatus,
    pub parent_id: Option<Uuid>,
    pub amount: BigDecimal,
    pub currency: String,
    /// Raw payload from the last processor interaction. Read back later to
    /// recover processor-side identifiers (refunds need `data.order_id`).
    pub response: Option<serde_json::Value>,
    pub reference: Option<String>,
    pub code: Option<String>,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        hash: String,
        kind: TransactionType,
        amount: BigDecimal,
        currency: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            hash,
            kind,
            status: TransactionStatus::Pending,
            parent_id: None,
            amount,
            currency,
            response: None,
            reference: None,
            code: None,
            message: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Fields for a child transaction about to be recorded under a root.
/// Amount and currency are copied from the root at insert time.
#[derive(Debug, Clone)]
pub struct NewChild {
    pub kind: TransactionType,
    pub status: TransactionStatus,
    pub response: serde_json::Value,
    pub reference: Option<String>,
    pub code: Option<String>,
    pub message: Option<String>,
}
