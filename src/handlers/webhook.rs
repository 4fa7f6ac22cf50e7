//! Inbound processor notifications.
//!
//! The processor expects a plain "ok" acknowledgement whatever happens:
//! returning an error would only trigger retries and alerts on their side
//! for conditions this system has already decided how to handle. Every
//! branch below therefore ends in the same acknowledgement; only the
//! persisted state and log output differ.

use axum::extract::{Query, State};
use serde::Deserialize;

use crate::db::models::TransactionType;
use crate::processor::response::normalize;
use crate::services::reconciler::{ReconcileOutcome, TransactionReconciler};
use crate::AppState;

const ACK: &str = "ok";

#[derive(Debug, Deserialize)]
pub struct WebhookParams {
    #[serde(rename = "commerceTransactionHash")]
    pub transaction_hash: Option<String>,
    #[serde(rename = "transactionid")]
    pub transaction_id: Option<String>,
}

pub async fn process_webhook(
    State(state): State<AppState>,
    Query(params): Query<WebhookParams>,
) -> &'static str {
    let Some(hash) = params.transaction_hash else {
        tracing::warn!("webhook notification without a transaction hash");
        return ACK;
    };

    let root = match state.store.find_by_hash(&hash).await {
        Ok(Some(tx)) => tx,
        Ok(None) => {
            tracing::warn!(hash = %hash, "transaction with this hash not found");
            return ACK;
        }
        Err(e) => {
            tracing::error!(hash = %hash, error = %e, "store lookup failed");
            return ACK;
        }
    };

    // Skip out early if a successful purchase child already exists; a
    // duplicate notification should not cost a processor round-trip.
    match state
        .store
        .has_successful_child(root.id, TransactionType::Purchase)
        .await
    {
        Ok(true) => {
            tracing::warn!(hash = %hash, "successful child transaction already exists");
            return ACK;
        }
        Ok(false) => {}
        Err(e) => {
            tracing::error!(hash = %hash, error = %e, "settled-child check failed");
            return ACK;
        }
    }

    let Some(processor_id) = params.transaction_id else {
        tracing::warn!(hash = %hash, "webhook notification without a processor transaction id");
        return ACK;
    };

    let response = match state.gateway.fetch_transaction_status(&processor_id).await {
        Ok(r) if r.success => r,
        Ok(_) => {
            tracing::warn!(
                hash = %hash,
                processor_id = %processor_id,
                "processor reported an unsuccessful response"
            );
            return ACK;
        }
        Err(e) => {
            // Transient upstream trouble; the processor retries the
            // notification on its own schedule.
            tracing::warn!(hash = %hash, processor_id = %processor_id, error = %e, "status fetch failed");
            return ACK;
        }
    };

    let outcome = normalize(&response);
    let reconciler = TransactionReconciler::new(state.store.clone());

    match reconciler.reconcile(&root, &outcome).await {
        Ok(ReconcileOutcome::Created(child)) => {
            tracing::info!(
                hash = %hash,
                child_id = %child.id,
                status = ?child.status,
                "recorded child transaction"
            );
        }
        Ok(ReconcileOutcome::AlreadySettled) => {
            tracing::warn!(hash = %hash, "transaction already settled");
        }
        Ok(ReconcileOutcome::Skipped) => {
            tracing::warn!(
                hash = %hash,
                status = ?response.payment_status(),
                "unrecognized processor state; nothing recorded"
            );
        }
        Err(e) => {
            // A lost reconciliation record is an accounting problem; make it
            // loud for operators even though the processor still gets "ok".
            tracing::error!(hash = %hash, error = %e, "failed to persist reconciliation result");
        }
    }

    ACK
}
