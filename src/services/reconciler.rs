//! Maps normalized payment outcomes onto child transactions.
//!
//! The decision itself is pure; persistence goes through the store, whose
//! atomic check-then-insert is what makes duplicate webhook deliveries
//! converge on a single success child.

use std::sync::Arc;

use crate::db::models::{NewChild, Transaction, TransactionStatus, TransactionType};
use crate::db::store::{StoreError, TransactionStore};
use crate::error::GatewayError;
use crate::processor::response::{OutcomeCategory, PaymentOutcome};

#[derive(Debug, Clone)]
pub enum ReconcileAction {
    NoOp,
    CreateChild(NewChild),
}

#[derive(Debug)]
pub enum ReconcileOutcome {
    /// A successful purchase child already exists; nothing was recorded.
    AlreadySettled,
    /// Unrecognized processor state; nothing was recorded.
    Skipped,
    Created(Transaction),
}

/// Decides what to do with a payment outcome for a root transaction.
///
/// A settled root is a no-op regardless of the outcome: the processor may
/// deliver notifications more than once or out of order, and re-processing a
/// settled purchase must be silent. An `Unknown` outcome is also a no-op so
/// unrecognized processor states never get recorded as spurious failures.
pub fn decide(
    root: &Transaction,
    already_settled: bool,
    outcome: &PaymentOutcome,
) -> ReconcileAction {
    if already_settled {
        return ReconcileAction::NoOp;
    }

    let status = match outcome.category {
        OutcomeCategory::Completed => TransactionStatus::Success,
        OutcomeCategory::Processing => TransactionStatus::Processing,
        OutcomeCategory::TerminalFailure => TransactionStatus::Failed,
        OutcomeCategory::Unknown => return ReconcileAction::NoOp,
    };

    ReconcileAction::CreateChild(NewChild {
        kind: root.kind,
        status,
        response: outcome.raw_response.clone(),
        code: outcome.processor_transaction_id.clone(),
        reference: outcome.processor_reference.clone(),
        message: outcome.message.clone(),
    })
}

pub struct TransactionReconciler {
    store: Arc<dyn TransactionStore>,
}

impl TransactionReconciler {
    pub fn new(store: Arc<dyn TransactionStore>) -> Self {
        Self { store }
    }

    /// Applies `decide` against the current store state and persists any
    /// resulting child. Store errors propagate: a lost reconciliation record
    /// breaks payment accounting, so they are never swallowed here.
    pub async fn reconcile(
        &self,
        root: &Transaction,
        outcome: &PaymentOutcome,
    ) -> Result<ReconcileOutcome, GatewayError> {
        let already_settled = self
            .store
            .has_successful_child(root.id, TransactionType::Purchase)
            .await?;

        match decide(root, already_settled, outcome) {
            ReconcileAction::NoOp if already_settled => Ok(ReconcileOutcome::AlreadySettled),
            ReconcileAction::NoOp => Ok(ReconcileOutcome::Skipped),
            ReconcileAction::CreateChild(child) => {
                match self.store.insert_child(root, child).await {
                    Ok(tx) => Ok(ReconcileOutcome::Created(tx)),
                    // Lost the race against a concurrent delivery; same
                    // terminal outcome as the pre-check.
                    Err(StoreError::SettledChildExists(_, _)) => {
                        Ok(ReconcileOutcome::AlreadySettled)
                    }
                    Err(e) => Err(e.into()),
                }
            }
        }
    }
}
