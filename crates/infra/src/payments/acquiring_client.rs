use anyhow::Result;
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::error;
use uuid::Uuid;

use application::interfaces::payment_gateway::{
    GatewayError, InitPaymentResponse, PaymentGateway,
};
use domain::value_objects::payment_webhook::{PaymentWebhook, ProviderPaymentStatus};

type HmacSha256 = Hmac<Sha256>;

/// Minimal acquiring-provider client built on reqwest. Callbacks are signed
/// with HMAC-SHA256 over the raw body using the shared webhook secret.
pub struct AcquiringClient {
    http: reqwest::Client,
    base_url: String,
    terminal_key: String,
    webhook_secret: String,
    success_url: String,
    fail_url: String,
}

#[derive(Debug, Serialize)]
struct InitRequest<'a> {
    #[serde(rename = "TerminalKey")]
    terminal_key: &'a str,
    #[serde(rename = "OrderId")]
    order_id: String,
    #[serde(rename = "Amount")]
    amount: i64,
    #[serde(rename = "Description")]
    description: &'a str,
    #[serde(rename = "SuccessURL")]
    success_url: &'a str,
    #[serde(rename = "FailURL")]
    fail_url: &'a str,
}

#[derive(Debug, Deserialize)]
struct InitResponse {
    #[serde(rename = "Success")]
    success: bool,
    #[serde(rename = "PaymentId")]
    payment_id: Option<String>,
    #[serde(rename = "PaymentURL")]
    payment_url: Option<String>,
    #[serde(rename = "Message")]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct CancelRequest<'a> {
    #[serde(rename = "TerminalKey")]
    terminal_key: &'a str,
    #[serde(rename = "PaymentId")]
    payment_id: &'a str,
    #[serde(rename = "Amount")]
    amount: i64,
}

#[derive(Debug, Deserialize)]
struct CancelResponse {
    #[serde(rename = "Success")]
    success: bool,
    #[serde(rename = "RefundId")]
    refund_id: Option<String>,
    #[serde(rename = "Message")]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WebhookPayload {
    #[serde(rename = "PaymentId")]
    payment_id: String,
    #[serde(rename = "OrderId")]
    order_id: Uuid,
    #[serde(rename = "Status")]
    status: String,
    #[serde(rename = "Amount")]
    amount: i64,
}

impl AcquiringClient {
    pub fn new(
        base_url: String,
        terminal_key: String,
        webhook_secret: String,
        success_url: String,
        fail_url: String,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("reqwest client must build");

        Self {
            http,
            base_url,
            terminal_key,
            webhook_secret,
            success_url,
            fail_url,
        }
    }

    fn map_transport_error(err: reqwest::Error, context: &str) -> GatewayError {
        if err.is_timeout() {
            return GatewayError::Unavailable(format!("{context} timed out"));
        }
        if err.is_connect() {
            return GatewayError::Unavailable(format!("{context} connection failed"));
        }
        GatewayError::Unavailable(format!("{context} request failed"))
    }

    async fn ensure_success(
        resp: reqwest::Response,
        context: &str,
    ) -> Result<reqwest::Response, GatewayError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        error!(
            status = %status,
            response_body = %body,
            context = %context,
            "acquiring api request failed"
        );

        if status.is_client_error() {
            Err(GatewayError::Rejected(format!(
                "{context} rejected with status {status}"
            )))
        } else {
            Err(GatewayError::Unavailable(format!(
                "{context} failed with status {status}"
            )))
        }
    }
}

#[async_trait]
impl PaymentGateway for AcquiringClient {
    async fn init_payment(
        &self,
        order_id: Uuid,
        amount_minor: i32,
        description: &str,
    ) -> Result<InitPaymentResponse, GatewayError> {
        let request = InitRequest {
            terminal_key: &self.terminal_key,
            order_id: order_id.to_string(),
            amount: amount_minor.into(),
            description,
            success_url: &self.success_url,
            fail_url: &self.fail_url,
        };

        let resp = self
            .http
            .post(format!("{}/v2/Init", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|err| Self::map_transport_error(err, "init payment"))?;
        let resp = Self::ensure_success(resp, "init payment").await?;

        let parsed: InitResponse = resp
            .json()
            .await
            .map_err(|err| Self::map_transport_error(err, "init payment body"))?;

        if !parsed.success {
            return Err(GatewayError::Rejected(
                parsed.message.unwrap_or_else(|| "init declined".to_string()),
            ));
        }

        match (parsed.payment_id, parsed.payment_url) {
            (Some(payment_id), Some(payment_url)) => Ok(InitPaymentResponse {
                provider_payment_id: payment_id,
                payment_url,
            }),
            _ => Err(GatewayError::Rejected(
                "init response is missing the payment reference".to_string(),
            )),
        }
    }

    async fn refund_payment(
        &self,
        provider_payment_id: &str,
        amount_minor: i32,
    ) -> Result<String, GatewayError> {
        let request = CancelRequest {
            terminal_key: &self.terminal_key,
            payment_id: provider_payment_id,
            amount: amount_minor.into(),
        };

        let resp = self
            .http
            .post(format!("{}/v2/Cancel", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|err| Self::map_transport_error(err, "refund payment"))?;
        let resp = Self::ensure_success(resp, "refund payment").await?;

        let parsed: CancelResponse = resp
            .json()
            .await
            .map_err(|err| Self::map_transport_error(err, "refund payment body"))?;

        if !parsed.success {
            return Err(GatewayError::Rejected(
                parsed
                    .message
                    .unwrap_or_else(|| "refund declined".to_string()),
            ));
        }

        Ok(parsed
            .refund_id
            .unwrap_or_else(|| provider_payment_id.to_string()))
    }

    fn verify_webhook(&self, payload: &[u8], signature: &str) -> Result<PaymentWebhook> {
        let mut mac = HmacSha256::new_from_slice(self.webhook_secret.as_bytes())?;
        mac.update(payload);
        let expected = mac.finalize().into_bytes();
        let provided = hex::decode(signature.trim())?;

        if expected[..] != provided[..] {
            anyhow::bail!("invalid webhook signature");
        }

        let parsed: WebhookPayload = serde_json::from_slice(payload)?;
        let status = ProviderPaymentStatus::from_str(&parsed.status)
            .ok_or_else(|| anyhow::anyhow!("unknown provider status: {}", parsed.status))?;

        Ok(PaymentWebhook {
            provider_payment_id: parsed.payment_id,
            order_id: parsed.order_id,
            status,
            amount_minor: i32::try_from(parsed.amount)
                .map_err(|_| anyhow::anyhow!("webhook amount out of range"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> AcquiringClient {
        AcquiringClient::new(
            "https://acquiring.example".to_string(),
            "terminal-1".to_string(),
            "webhook-secret-123".to_string(),
            "https://washbay.example/paid".to_string(),
            "https://washbay.example/failed".to_string(),
        )
    }

    fn sign(payload: &[u8], secret: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    fn webhook_body(order_id: Uuid, status: &str) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "PaymentId": "pp-42",
            "OrderId": order_id,
            "Status": status,
            "Amount": 3000,
        }))
        .unwrap()
    }

    #[test]
    fn a_correctly_signed_webhook_verifies() {
        let order_id = Uuid::new_v4();
        let body = webhook_body(order_id, "CONFIRMED");
        let signature = sign(&body, "webhook-secret-123");

        let webhook = client().verify_webhook(&body, &signature).unwrap();

        assert_eq!(webhook.provider_payment_id, "pp-42");
        assert_eq!(webhook.order_id, order_id);
        assert_eq!(webhook.status, ProviderPaymentStatus::Confirmed);
        assert_eq!(webhook.amount_minor, 3000);
    }

    #[test]
    fn a_webhook_signed_with_the_wrong_secret_is_rejected() {
        let body = webhook_body(Uuid::new_v4(), "CONFIRMED");
        let signature = sign(&body, "not-the-secret");

        assert!(client().verify_webhook(&body, &signature).is_err());
    }

    #[test]
    fn a_tampered_payload_fails_verification() {
        let body = webhook_body(Uuid::new_v4(), "CONFIRMED");
        let signature = sign(&body, "webhook-secret-123");
        let tampered = webhook_body(Uuid::new_v4(), "REJECTED");

        assert!(client().verify_webhook(&tampered, &signature).is_err());
    }

    #[test]
    fn an_unknown_provider_status_is_rejected() {
        let body = webhook_body(Uuid::new_v4(), "HALF_CONFIRMED");
        let signature = sign(&body, "webhook-secret-123");

        assert!(client().verify_webhook(&body, &signature).is_err());
    }
}
