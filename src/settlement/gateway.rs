//! External payment gateway seam
//!
//! The gateway creates orders; confirmation later arrives out of band as
//! a signed proof. Behind a trait so the HTTP client and the local dev
//! stub are interchangeable.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::types::{Result, WaysideError};

/// Gateway orders are denominated in minor units of this currency
const ORDER_CURRENCY: &str = "INR";

/// An order opened at the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayOrder {
    /// External order reference
    pub order_ref: String,
    /// Amount in minor units, as the gateway carries it
    pub amount_minor: i64,
    pub currency: String,
    /// Receipt label supplied by us
    pub receipt: String,
}

/// Creates orders at the external payment gateway
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open an order for `amount` (major units). Gateway refusal or
    /// timeout surfaces as `Upstream`.
    async fn create_order(&self, amount: i64, receipt: &str) -> Result<GatewayOrder>;
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
}

/// HTTP-backed gateway client
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl HttpPaymentGateway {
    pub fn new(
        base_url: String,
        key_id: String,
        key_secret: String,
        timeout_ms: u64,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| WaysideError::Upstream(format!("Failed to build gateway client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            key_id,
            key_secret,
        })
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_order(&self, amount: i64, receipt: &str) -> Result<GatewayOrder> {
        let amount_minor = amount * 100;

        let response = self
            .client
            .post(format!("{}/v1/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&serde_json::json!({
                "amount": amount_minor,
                "currency": ORDER_CURRENCY,
                "receipt": receipt,
            }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    WaysideError::Upstream("gateway order creation timed out".into())
                } else {
                    WaysideError::Upstream(format!("gateway unreachable: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            warn!(%status, "gateway refused order creation");
            return Err(WaysideError::Upstream(format!(
                "gateway refused order creation: {}",
                status
            )));
        }

        let order: OrderResponse = response
            .json()
            .await
            .map_err(|e| WaysideError::Upstream(format!("invalid gateway response: {}", e)))?;

        debug!(order = %order.id, receipt, "gateway order created");

        Ok(GatewayOrder {
            order_ref: order.id,
            amount_minor,
            currency: ORDER_CURRENCY.to_string(),
            receipt: receipt.to_string(),
        })
    }
}

/// Local stub used in dev mode and tests: mints order references
/// without leaving the process
pub struct LocalPaymentGateway;

#[async_trait]
impl PaymentGateway for LocalPaymentGateway {
    async fn create_order(&self, amount: i64, receipt: &str) -> Result<GatewayOrder> {
        Ok(GatewayOrder {
            order_ref: format!("order_{}", Uuid::new_v4().simple()),
            amount_minor: amount * 100,
            currency: ORDER_CURRENCY.to_string(),
            receipt: receipt.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_gateway_mints_unique_orders() {
        let gateway = LocalPaymentGateway;

        let a = gateway.create_order(500, "receipt_a").await.unwrap();
        let b = gateway.create_order(500, "receipt_b").await.unwrap();

        assert_ne!(a.order_ref, b.order_ref);
        assert!(a.order_ref.starts_with("order_"));
        assert_eq!(a.amount_minor, 50_000);
        assert_eq!(a.currency, "INR");
    }
}
