pub mod purchase;
pub mod reconciler;
pub mod refund;

use bigdecimal::{BigDecimal, ToPrimitive};

use crate::error::GatewayError;
use crate::processor::response::{normalize, OutcomeCategory, PaymentOutcome, ProcessorResponse};

/// Result of a synchronous purchase/refund call: the envelope flag plus the
/// normalized outcome, so callers handle every processor interaction through
/// the same contract.
#[derive(Debug, Clone)]
pub struct RequestOutcome {
    pub success: bool,
    pub outcome: PaymentOutcome,
}

impl RequestOutcome {
    pub fn from_response(response: &ProcessorResponse) -> Self {
        Self {
            success: response.success,
            outcome: normalize(response),
        }
    }

    pub fn is_processing(&self) -> bool {
        self.outcome.category == OutcomeCategory::Processing
    }
}

/// Converts a decimal amount to the minor units the processor API expects.
/// Sub-cent precision is rejected rather than truncated; a silently shaved
/// amount would disagree with what the order system recorded.
pub(crate) fn to_minor_units(amount: &BigDecimal) -> Result<i64, GatewayError> {
    let scaled = amount.clone() * BigDecimal::from(100);
    if scaled.with_scale(0) != scaled {
        return Err(GatewayError::Unsupported(format!(
            "amount {amount} has sub-cent precision"
        )));
    }

    scaled
        .to_i64()
        .ok_or_else(|| GatewayError::Unsupported(format!("amount {amount} not representable")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    #[test]
    fn test_request_outcome_reflects_envelope_and_category() {
        let response = ProcessorResponse::from_raw(json!({
            "success": true,
            "data": {"order_id": "P123", "status": "uncleared"}
        }));

        let outcome = RequestOutcome::from_response(&response);
        assert!(outcome.success);
        assert!(outcome.is_processing());
    }

    #[test]
    fn test_to_minor_units() {
        let amount = BigDecimal::from_str("10.50").unwrap();
        assert_eq!(to_minor_units(&amount).unwrap(), 1050);
    }

    #[test]
    fn test_to_minor_units_whole_amount() {
        let amount = BigDecimal::from(7);
        assert_eq!(to_minor_units(&amount).unwrap(), 700);
    }

    #[test]
    fn test_to_minor_units_rejects_sub_cent_precision() {
        let amount = BigDecimal::from_str("10.505").unwrap();
        assert!(matches!(
            to_minor_units(&amount),
            Err(GatewayError::Unsupported(_))
        ));
    }
}
