//! Outbound purchase requests.
//!
//! Purchases are redirect-mode: the buyer is sent to the processor's payment
//! page, and the processor later reports the result through the webhook. The
//! correlation hash travels in the notification URL so the webhook can find
//! the root transaction again.

use crate::db::models::Transaction;
use crate::error::GatewayError;
use crate::processor::client::{GatewayClient, OutboundRequest, PaymentOptions};
use crate::services::{to_minor_units, RequestOutcome};

/// Callback invoked on the outbound request before dispatch. Hooks may
/// adjust the request; the flow re-asserts identity fields afterwards.
pub type PreSendHook = Box<dyn Fn(&mut OutboundRequest) + Send + Sync>;

pub struct PurchaseFlow {
    gateway: GatewayClient,
    notification_base_url: String,
    hooks: Vec<PreSendHook>,
}

impl PurchaseFlow {
    pub fn new(gateway: GatewayClient, notification_base_url: impl Into<String>) -> Self {
        Self {
            gateway,
            notification_base_url: notification_base_url.into(),
            hooks: Vec::new(),
        }
    }

    /// Registers a hook to run on every outbound request before it is sent.
    pub fn on_before_send(&mut self, hook: PreSendHook) {
        self.hooks.push(hook);
    }

    fn notification_url(&self, hash: &str) -> String {
        format!(
            "{}/webhooks/notify?commerceTransactionHash={}",
            self.notification_base_url.trim_end_matches('/'),
            hash
        )
    }

    /// Builds the redirect-mode order request for a root transaction.
    pub fn prepare_purchase_request(
        &self,
        transaction: &Transaction,
    ) -> Result<OutboundRequest, GatewayError> {
        Ok(OutboundRequest {
            kind: "redirect".to_string(),
            order_id: transaction.hash.clone(),
            currency: transaction.currency.clone(),
            amount: to_minor_units(&transaction.amount)?,
            description: format!("Order {}", transaction.hash),
            locale: self.gateway.locale().to_string(),
            payment_options: PaymentOptions {
                notification_url: self.notification_url(&transaction.hash),
                redirect_url: None,
                cancel_url: None,
            },
        })
    }

    fn apply_hooks(&self, transaction: &Transaction, request: &mut OutboundRequest) {
        for hook in &self.hooks {
            hook(request);
        }

        // Hooks must not alter the fields the webhook lookup depends on.
        request.order_id = transaction.hash.clone();
        request.payment_options.notification_url = self.notification_url(&transaction.hash);
    }

    /// Prepares, runs pre-send hooks, and dispatches the purchase request.
    pub async fn purchase(
        &self,
        transaction: &Transaction,
    ) -> Result<RequestOutcome, GatewayError> {
        let mut request = self.prepare_purchase_request(transaction)?;
        self.apply_hooks(transaction, &mut request);

        let response = self.gateway.create_order(&request).await?;
        tracing::debug!(
            hash = %transaction.hash,
            success = response.success,
            "purchase request sent"
        );

        Ok(RequestOutcome::from_response(&response))
    }

    /// Re-queries the processor when the buyer returns from the redirect and
    /// reports the order's current state under the normalized contract.
    pub async fn complete_purchase(
        &self,
        transaction: &Transaction,
    ) -> Result<RequestOutcome, GatewayError> {
        let response = self
            .gateway
            .fetch_transaction_status(&transaction.hash)
            .await?;

        tracing::debug!(
            hash = %transaction.hash,
            raw = %response.raw(),
            "complete purchase response"
        );

        Ok(RequestOutcome::from_response(&response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessorConfig;
    use crate::db::models::TransactionType;
    use bigdecimal::BigDecimal;
    use std::str::FromStr;

    fn flow() -> PurchaseFlow {
        let gateway = GatewayClient::new(ProcessorConfig {
            api_url: "http://localhost:1".to_string(),
            api_key: "k".to_string(),
            locale: "nl_NL".to_string(),
            test_mode: true,
        });
        PurchaseFlow::new(gateway, "https://shop.example.com/")
    }

    fn transaction() -> Transaction {
        Transaction::new(
            "h1".to_string(),
            TransactionType::Purchase,
            BigDecimal::from_str("10.50").unwrap(),
            "EUR".to_string(),
        )
    }

    #[test]
    fn test_prepare_purchase_request() {
        let request = flow().prepare_purchase_request(&transaction()).unwrap();

        assert_eq!(request.kind, "redirect");
        assert_eq!(request.order_id, "h1");
        assert_eq!(request.amount, 1050);
        assert_eq!(request.currency, "EUR");
        assert_eq!(request.locale, "nl_NL");
        assert_eq!(
            request.payment_options.notification_url,
            "https://shop.example.com/webhooks/notify?commerceTransactionHash=h1"
        );
    }

    #[test]
    fn test_hooks_run_in_order() {
        let mut flow = flow();
        flow.on_before_send(Box::new(|req| req.description.push_str(" one")));
        flow.on_before_send(Box::new(|req| req.description.push_str(" two")));

        let tx = transaction();
        let mut request = flow.prepare_purchase_request(&tx).unwrap();
        flow.apply_hooks(&tx, &mut request);

        assert!(request.description.ends_with("one two"));
    }

    #[test]
    fn test_hooks_cannot_alter_identity_fields() {
        let mut flow = flow();
        flow.on_before_send(Box::new(|req| {
            req.order_id = "tampered".to_string();
            req.payment_options.notification_url = "http://evil.example.com".to_string();
        }));

        let tx = transaction();
        let mut request = flow.prepare_purchase_request(&tx).unwrap();
        flow.apply_hooks(&tx, &mut request);

        assert_eq!(request.order_id, "h1");
        assert!(request
            .payment_options
            .notification_url
            .contains("commerceTransactionHash=h1"));
    }
}
