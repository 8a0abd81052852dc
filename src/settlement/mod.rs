//! Payment settlement
//!
//! `gateway` is the external payment-gateway seam, `proof` the keyed
//! hash over order and transaction references, `verifier` the
//! confirmation step that finalizes payment and request together.

pub mod gateway;
pub mod proof;
pub mod verifier;

pub use gateway::{GatewayOrder, HttpPaymentGateway, LocalPaymentGateway, PaymentGateway};
pub use verifier::SettlementVerifier;
