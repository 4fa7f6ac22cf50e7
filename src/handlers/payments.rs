//! Purchase and refund endpoints for the order system.
//!
//! These are the synchronous half of the gateway; the webhook handler picks
//! up whatever the processor reports afterwards. Failures here surface as
//! typed `GatewayError` responses instead of being absorbed.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::models::{Transaction, TransactionType};
use crate::error::GatewayError;
use crate::processor::OutcomeCategory;
use crate::services::RequestOutcome;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreatePurchase {
    pub hash: String,
    pub amount: BigDecimal,
    pub currency: String,
}

#[derive(Debug, Serialize)]
pub struct PaymentView {
    pub transaction_id: Uuid,
    pub hash: String,
    pub success: bool,
    pub category: OutcomeCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_url: Option<String>,
}

fn view(tx: &Transaction, outcome: &RequestOutcome) -> PaymentView {
    PaymentView {
        transaction_id: tx.id,
        hash: tx.hash.clone(),
        success: outcome.success,
        category: outcome.outcome.category,
        payment_url: outcome.outcome.payment_url().map(str::to_string),
    }
}

/// Initiates a redirect-mode purchase. Re-initiating for a hash whose
/// purchase already settled is a conflict, not a second order.
pub async fn create_purchase(
    State(state): State<AppState>,
    Json(req): Json<CreatePurchase>,
) -> Result<(StatusCode, Json<PaymentView>), GatewayError> {
    let root = match state.store.find_by_hash(&req.hash).await? {
        Some(existing) => {
            let settled = state
                .store
                .has_successful_child(existing.id, TransactionType::Purchase)
                .await?;
            if settled {
                return Err(GatewayError::AlreadySettled(existing.id));
            }
            existing
        }
        None => {
            let root = Transaction::new(
                req.hash,
                TransactionType::Purchase,
                req.amount,
                req.currency,
            );
            state.store.insert(&root).await?
        }
    };

    let outcome = state.purchases.purchase(&root).await?;
    Ok((StatusCode::CREATED, Json(view(&root, &outcome))))
}

/// Reports the current processor-side state of a purchase, for when the
/// buyer returns from the redirect before the webhook lands.
pub async fn purchase_status(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<PaymentView>, GatewayError> {
    let root = state
        .store
        .find_by_hash(&hash)
        .await?
        .ok_or_else(|| GatewayError::NotFound(format!("transaction {hash}")))?;

    let outcome = state.purchases.complete_purchase(&root).await?;
    Ok(Json(view(&root, &outcome)))
}

/// Issues a refund against a settled transaction. The refund record is
/// persisted only once the processor has accepted the request; its terminal
/// status arrives through the webhook like any other state change.
pub async fn create_refund(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<(StatusCode, Json<PaymentView>), GatewayError> {
    let parent = state
        .store
        .find_by_hash(&hash)
        .await?
        .ok_or_else(|| GatewayError::NotFound(format!("transaction {hash}")))?;

    let mut refund_tx = Transaction::new(
        Uuid::new_v4().simple().to_string(),
        TransactionType::Refund,
        parent.amount.clone(),
        parent.currency.clone(),
    );
    refund_tx.parent_id = Some(parent.id);

    let outcome = state.refunds.refund(&refund_tx).await?;

    refund_tx.response = Some(outcome.outcome.raw_response.clone());
    let refund_tx = state.store.insert(&refund_tx).await?;

    Ok((StatusCode::CREATED, Json(view(&refund_tx, &outcome))))
}
