use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::db::store::StoreError;
use crate::processor::client::ProcessorError;

/// Failure taxonomy for the gateway adapter.
///
/// Webhook-path errors are absorbed by the handler and never reach the
/// processor; purchase/refund-path errors are surfaced to the caller through
/// the `IntoResponse` mapping below.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("transaction {0} is already settled")]
    AlreadySettled(Uuid),

    #[error("processor call failed: {0}")]
    Upstream(#[from] ProcessorError),

    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl GatewayError {
    fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::AlreadySettled(_) => StatusCode::CONFLICT,
            GatewayError::Upstream(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Unsupported(_) => StatusCode::BAD_REQUEST,
            GatewayError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
