//! Refunds against a previously settled purchase.
//!
//! A refund request must be addressed to the processor's own order id, which
//! is only available inside the parent transaction's stored response. Missing
//! reference means the refund cannot be built at all, so that is a hard
//! precondition failure rather than something to retry.

use std::sync::Arc;

use crate::db::models::Transaction;
use crate::db::store::{StoreError, TransactionStore};
use crate::error::GatewayError;
use crate::processor::client::{GatewayClient, RefundRequest};
use crate::services::{to_minor_units, RequestOutcome};

pub struct RefundFlow {
    gateway: GatewayClient,
    store: Arc<dyn TransactionStore>,
}

impl RefundFlow {
    pub fn new(gateway: GatewayClient, store: Arc<dyn TransactionStore>) -> Self {
        Self { gateway, store }
    }

    /// Issues a refund for `transaction`, recovering the processor-side order
    /// id from the parent's stored response. No outbound call is made unless
    /// the order reference is present.
    pub async fn refund(&self, transaction: &Transaction) -> Result<RequestOutcome, GatewayError> {
        let parent_id = transaction.parent_id.ok_or_else(|| {
            GatewayError::Unsupported("cannot refund: transaction has no parent".to_string())
        })?;

        let parent = self.store.get(parent_id).await.map_err(|e| match e {
            StoreError::NotFound(id) => GatewayError::NotFound(format!("parent transaction {id}")),
            other => GatewayError::Store(other),
        })?;

        let order_id = parent
            .response
            .as_ref()
            .and_then(|r| r["data"]["order_id"].as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                GatewayError::Unsupported(
                    "cannot refund: parent order reference missing".to_string(),
                )
            })?;

        let request = RefundRequest {
            currency: transaction.currency.clone(),
            amount: to_minor_units(&transaction.amount)?,
            description: transaction.reference.clone(),
        };

        let response = self.gateway.refund(&order_id, &request).await?;
        tracing::info!(
            transaction_id = %transaction.id,
            order_id = %order_id,
            success = response.success,
            "refund request sent"
        );

        Ok(RequestOutcome::from_response(&response))
    }
}
