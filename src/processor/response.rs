//! Normalization of processor responses.
//!
//! The processor speaks in raw status strings ("completed", "uncleared",
//! "void", ...). Everything downstream of this module sees only
//! [`OutcomeCategory`]; the vocabulary mapping lives here and nowhere else.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A response from the processor API: the `success` envelope flag plus the
/// raw JSON payload. Field access goes through accessors so unexpected
/// shapes degrade to `None` instead of failing.
#[derive(Debug, Clone)]
pub struct ProcessorResponse {
    pub success: bool,
    raw: Value,
}

impl ProcessorResponse {
    pub fn from_raw(raw: Value) -> Self {
        let success = raw["success"].as_bool().unwrap_or(false);
        Self { success, raw }
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn payment_status(&self) -> Option<&str> {
        self.raw["data"]["status"].as_str()
    }

    /// The processor-side order identifier.
    pub fn order_id(&self) -> Option<&str> {
        self.raw["data"]["order_id"].as_str()
    }

    /// The processor's internal transaction reference. Arrives as a number
    /// or a string depending on the endpoint.
    pub fn transaction_reference(&self) -> Option<String> {
        match &self.raw["data"]["transaction_id"] {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn message(&self) -> Option<String> {
        self.raw["data"]["reason"]
            .as_str()
            .or_else(|| self.raw["error_info"].as_str())
            .map(str::to_string)
    }
}

/// Processor-agnostic classification of a payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeCategory {
    Completed,
    Processing,
    TerminalFailure,
    Unknown,
}

/// The canonical result of a processor interaction. Derived, never persisted
/// as such; the raw payload is what gets stored on the child transaction.
#[derive(Debug, Clone)]
pub struct PaymentOutcome {
    pub category: OutcomeCategory,
    pub raw_response: Value,
    pub processor_transaction_id: Option<String>,
    pub processor_reference: Option<String>,
    pub message: Option<String>,
}

impl PaymentOutcome {
    /// Redirect target for the buyer, when the processor supplies one.
    pub fn payment_url(&self) -> Option<&str> {
        self.raw_response["data"]["payment_url"].as_str()
    }
}

/// Converts a processor response into a [`PaymentOutcome`]. Total: an
/// unrecognized or missing status maps to `Unknown` rather than erroring,
/// because webhook delivery must not be interrupted by unexpected processor
/// vocabulary.
pub fn normalize(response: &ProcessorResponse) -> PaymentOutcome {
    let category = match response.payment_status() {
        Some("completed") => OutcomeCategory::Completed,
        Some("initialized") | Some("uncleared") => OutcomeCategory::Processing,
        // "void" is the processor's other spelling of cancelled.
        Some("expired") | Some("declined") | Some("cancelled") | Some("void") => {
            OutcomeCategory::TerminalFailure
        }
        _ => OutcomeCategory::Unknown,
    };

    PaymentOutcome {
        category,
        raw_response: response.raw().clone(),
        processor_transaction_id: response.order_id().map(str::to_string),
        processor_reference: response.transaction_reference(),
        message: response.message(),
    }
}
