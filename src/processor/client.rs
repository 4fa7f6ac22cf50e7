//! HTTP client for the payment processor's REST API.
//!
//! Credentials, locale and the test/live flag come from configuration; the
//! client adds a bounded timeout and a circuit breaker so a degraded
//! processor trips fast instead of stalling webhook handling.

use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::{backoff, failure_policy, Config, Error as FailsafeError, StateMachine};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::config::ProcessorConfig;
use crate::processor::response::ProcessorResponse;

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("invalid response from processor: {0}")]
    InvalidResponse(String),
    #[error("circuit breaker open: {0}")]
    CircuitBreakerOpen(String),
}

/// Redirect-mode order creation request. The buyer is sent off-system to the
/// processor's payment page; `notification_url` carries the correlation hash
/// so the later webhook can find the root transaction again.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub order_id: String,
    pub currency: String,
    /// Amount in minor units.
    pub amount: i64,
    pub description: String,
    pub locale: String,
    pub payment_options: PaymentOptions,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentOptions {
    pub notification_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_url: Option<String>,
}

/// Refund request scoped to a processor-side order.
#[derive(Debug, Clone, Serialize)]
pub struct RefundRequest {
    pub currency: String,
    /// Amount in minor units.
    pub amount: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Typed wrapper over the processor REST API.
#[derive(Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: String,
    api_key: String,
    locale: String,
    test_mode: bool,
    circuit_breaker: StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>,
}

impl GatewayClient {
    pub fn new(config: ProcessorConfig) -> Self {
        Self::with_circuit_breaker(config, 3, 60)
    }

    /// Creates a client with custom circuit breaker configuration.
    pub fn with_circuit_breaker(
        config: ProcessorConfig,
        failure_threshold: u32,
        reset_timeout_secs: u64,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        let backoff = backoff::equal_jittered(
            Duration::from_secs(reset_timeout_secs),
            Duration::from_secs(reset_timeout_secs * 2),
        );
        let policy = failure_policy::consecutive_failures(failure_threshold, backoff);
        let circuit_breaker = Config::new().failure_policy(policy).build();

        GatewayClient {
            client,
            base_url: config.api_url,
            api_key: config.api_key,
            locale: config.locale,
            test_mode: config.test_mode,
            circuit_breaker,
        }
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn is_test_mode(&self) -> bool {
        self.test_mode
    }

    /// Returns the current state of the circuit breaker.
    pub fn circuit_state(&self) -> &'static str {
        if self.circuit_breaker.is_call_permitted() {
            "closed"
        } else {
            "open"
        }
    }

    fn order_url(&self, order_id: &str) -> String {
        format!("{}/orders/{}", self.base_url.trim_end_matches('/'), order_id)
    }

    async fn dispatch(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<ProcessorResponse, ProcessorError> {
        let result = self
            .circuit_breaker
            .call(async move {
                let response = request.send().await?;
                let status = response.status();

                let raw: Value = response.json().await.map_err(|_| {
                    ProcessorError::InvalidResponse(format!("non-JSON body (HTTP {status})"))
                })?;

                Ok(ProcessorResponse::from_raw(raw))
            })
            .await;

        match result {
            Ok(response) => Ok(response),
            Err(FailsafeError::Rejected) => Err(ProcessorError::CircuitBreakerOpen(
                "processor API circuit breaker is open".to_string(),
            )),
            Err(FailsafeError::Inner(e)) => Err(e),
        }
    }

    /// Fetches the current status of a processor-side order.
    pub async fn fetch_transaction_status(
        &self,
        order_id: &str,
    ) -> Result<ProcessorResponse, ProcessorError> {
        let request = self
            .client
            .get(self.order_url(order_id))
            .header("api_key", &self.api_key);

        self.dispatch(request).await
    }

    /// Creates a redirect-mode order at the processor.
    pub async fn create_order(
        &self,
        order: &OutboundRequest,
    ) -> Result<ProcessorResponse, ProcessorError> {
        let url = format!("{}/orders", self.base_url.trim_end_matches('/'));
        let request = self
            .client
            .post(url)
            .header("api_key", &self.api_key)
            .json(order);

        self.dispatch(request).await
    }

    /// Issues a refund against a processor-side order.
    pub async fn refund(
        &self,
        order_id: &str,
        refund: &RefundRequest,
    ) -> Result<ProcessorResponse, ProcessorError> {
        let url = format!("{}/refunds", self.order_url(order_id));
        let request = self
            .client
            .post(url)
            .header("api_key", &self.api_key)
            .json(refund);

        self.dispatch(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_config(base_url: String) -> ProcessorConfig {
        ProcessorConfig {
            api_url: base_url,
            api_key: "test-key".to_string(),
            locale: "en_US".to_string(),
            test_mode: true,
        }
    }

    #[tokio::test]
    async fn test_fetch_transaction_status() {
        let mut server = mockito::Server::new_async().await;

        let body = json!({
            "success": true,
            "data": {
                "order_id": "P123",
                "transaction_id": 4051823,
                "status": "completed"
            }
        });

        let _mock = server
            .mock("GET", "/orders/P123")
            .match_header("api_key", "test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;

        let client = GatewayClient::new(test_config(server.url()));
        let response = client.fetch_transaction_status("P123").await.unwrap();

        assert!(response.success);
        assert_eq!(response.payment_status(), Some("completed"));
        assert_eq!(response.order_id(), Some("P123"));
        assert_eq!(response.transaction_reference().as_deref(), Some("4051823"));
    }

    #[tokio::test]
    async fn test_refund_hits_order_scoped_endpoint() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("POST", "/orders/P123/refunds")
            .match_header("api_key", "test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success": true, "data": {"refund_id": 99}}"#)
            .create_async()
            .await;

        let client = GatewayClient::new(test_config(server.url()));
        let refund = RefundRequest {
            currency: "EUR".to_string(),
            amount: 1050,
            description: None,
        };

        let response = client.refund("P123", &refund).await.unwrap();
        assert!(response.success);
    }

    #[tokio::test]
    async fn test_non_json_body_is_invalid_response() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("GET", "/orders/P123")
            .with_status(502)
            .with_body("Bad Gateway")
            .create_async()
            .await;

        let client = GatewayClient::new(test_config(server.url()));
        let result = client.fetch_transaction_status("P123").await;

        assert!(matches!(result, Err(ProcessorError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_unsuccessful_envelope_is_not_an_error() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("GET", "/orders/P404")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success": false, "error_code": 1006}"#)
            .create_async()
            .await;

        let client = GatewayClient::new(test_config(server.url()));
        let response = client.fetch_transaction_status("P404").await.unwrap();

        assert!(!response.success);
    }

    #[tokio::test]
    async fn test_circuit_breaker_opens_after_failures() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("GET", "/orders/P123")
            .with_status(500)
            .with_body("boom")
            .expect_at_least(3)
            .create_async()
            .await;

        let client = GatewayClient::with_circuit_breaker(test_config(server.url()), 3, 60);

        for _ in 0..3 {
            let _ = client.fetch_transaction_status("P123").await;
        }

        let result = client.fetch_transaction_status("P123").await;
        assert!(matches!(result, Err(ProcessorError::CircuitBreakerOpen(_))));
        assert_eq!(client.circuit_state(), "open");
    }
}
