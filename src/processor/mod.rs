pub mod client;
pub mod response;

pub use client::GatewayClient;
pub use response::{normalize, OutcomeCategory, PaymentOutcome, ProcessorResponse};
