use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use domain::value_objects::payment_webhook::PaymentWebhook;

#[derive(Debug, Clone)]
pub struct InitPaymentResponse {
    pub provider_payment_id: String,
    pub payment_url: String,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The provider permanently rejected the request; retrying cannot help.
    #[error("payment provider rejected the request: {0}")]
    Rejected(String),
    /// Network trouble or a provider outage; retry per component policy.
    #[error("payment provider unavailable: {0}")]
    Unavailable(String),
}

impl GatewayError {
    pub fn is_transient(&self) -> bool {
        matches!(self, GatewayError::Unavailable(_))
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Registers a payment with the provider and returns the checkout URL the
    /// customer is redirected to.
    async fn init_payment(
        &self,
        order_id: Uuid,
        amount_minor: i32,
        description: &str,
    ) -> Result<InitPaymentResponse, GatewayError>;

    /// Requests a (possibly partial) refund; returns the provider refund id.
    async fn refund_payment(
        &self,
        provider_payment_id: &str,
        amount_minor: i32,
    ) -> Result<String, GatewayError>;

    /// Verifies the callback signature and normalizes the payload. Untrusted
    /// input must never reach the ledger without passing through here.
    fn verify_webhook(&self, payload: &[u8], signature: &str) -> anyhow::Result<PaymentWebhook>;
}
