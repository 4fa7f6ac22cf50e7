pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod processor;
pub mod services;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::db::store::TransactionStore;
use crate::processor::GatewayClient;
use crate::services::purchase::PurchaseFlow;
use crate::services::refund::RefundFlow;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TransactionStore>,
    pub gateway: GatewayClient,
    pub purchases: Arc<PurchaseFlow>,
    pub refunds: Arc<RefundFlow>,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/webhooks/notify", get(handlers::webhook::process_webhook))
        .route("/purchases", post(handlers::payments::create_purchase))
        .route("/purchases/:hash", get(handlers::payments::purchase_status))
        .route(
            "/transactions/:hash/refunds",
            post(handlers::payments::create_refund),
        )
        .with_state(state)
}
