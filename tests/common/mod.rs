//! Shared fixtures for the integration tests: an in-memory store mirroring
//! the Postgres semantics, and a router wired against a given processor URL.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::AtomicUsize;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use paygate::config::ProcessorConfig;
use paygate::db::models::{NewChild, Transaction, TransactionStatus, TransactionType};
use paygate::db::store::{StoreError, TransactionStore};
use paygate::processor::GatewayClient;
use paygate::services::purchase::PurchaseFlow;
use paygate::services::refund::RefundFlow;
use paygate::{create_app, AppState};

/// In-memory store mirroring the Postgres semantics: `insert_child` performs
/// the settled-child check and the insert under one lock.
#[derive(Default)]
pub struct InMemoryStore {
    pub transactions: Mutex<HashMap<Uuid, Transaction>>,
    pub find_by_hash_calls: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn children_of(&self, parent_id: Uuid) -> Vec<Transaction> {
        self.transactions
            .lock()
            .unwrap()
            .values()
            .filter(|t| t.parent_id == Some(parent_id))
            .cloned()
            .collect()
    }

    pub fn count(&self) -> usize {
        self.transactions.lock().unwrap().len()
    }
}

#[async_trait]
impl TransactionStore for InMemoryStore {
    async fn find_by_hash(&self, hash: &str) -> Result<Option<Transaction>, StoreError> {
        self.find_by_hash_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(self
            .transactions
            .lock()
            .unwrap()
            .values()
            .find(|t| t.hash == hash)
            .cloned())
    }

    async fn get(&self, id: Uuid) -> Result<Transaction, StoreError> {
        self.transactions
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn has_successful_child(
        &self,
        parent_id: Uuid,
        kind: TransactionType,
    ) -> Result<bool, StoreError> {
        Ok(self.transactions.lock().unwrap().values().any(|t| {
            t.parent_id == Some(parent_id)
                && t.kind == kind
                && t.status == TransactionStatus::Success
        }))
    }

    async fn insert_child(
        &self,
        root: &Transaction,
        child: NewChild,
    ) -> Result<Transaction, StoreError> {
        let mut transactions = self.transactions.lock().unwrap();

        let settled = transactions.values().any(|t| {
            t.parent_id == Some(root.id)
                && t.kind == TransactionType::Purchase
                && t.status == TransactionStatus::Success
        });
        if settled {
            return Err(StoreError::SettledChildExists(
                root.id,
                TransactionType::Purchase,
            ));
        }

        let now = Utc::now();
        let inserted = Transaction {
            id: Uuid::new_v4(),
            hash: Uuid::new_v4().simple().to_string(),
            kind: child.kind,
            status: child.status,
            parent_id: Some(root.id),
            amount: root.amount.clone(),
            currency: root.currency.clone(),
            response: Some(child.response),
            reference: child.reference,
            code: child.code,
            message: child.message,
            created_at: now,
            updated_at: now,
        };
        transactions.insert(inserted.id, inserted.clone());
        Ok(inserted)
    }

    async fn insert(&self, tx: &Transaction) -> Result<Transaction, StoreError> {
        self.transactions
            .lock()
            .unwrap()
            .insert(tx.id, tx.clone());
        Ok(tx.clone())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

pub fn app(store: Arc<InMemoryStore>, processor_url: &str) -> axum::Router {
    let gateway = GatewayClient::new(ProcessorConfig {
        api_url: processor_url.to_string(),
        api_key: "test-key".to_string(),
        locale: "en_US".to_string(),
        test_mode: true,
    });

    let store: Arc<dyn TransactionStore> = store;
    let purchases = Arc::new(PurchaseFlow::new(gateway.clone(), "http://localhost:3000"));
    let refunds = Arc::new(RefundFlow::new(gateway.clone(), store.clone()));

    create_app(AppState {
        store,
        gateway,
        purchases,
        refunds,
    })
}
