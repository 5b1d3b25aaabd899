use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A verified provider callback, normalized from the acquiring wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentWebhook {
    pub provider_payment_id: String,
    pub order_id: Uuid,
    pub status: ProviderPaymentStatus,
    pub amount_minor: i32,
}

impl PaymentWebhook {
    /// Dedup key for the event ledger: one row per (payment, reported status),
    /// however many times the provider redelivers it.
    pub fn dedup_key(&self) -> String {
        format!("{}:{}", self.provider_payment_id, self.status.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProviderPaymentStatus {
    Authorized,
    Confirmed,
    Rejected,
    Canceled,
    Refunded,
}

impl ProviderPaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderPaymentStatus::Authorized => "AUTHORIZED",
            ProviderPaymentStatus::Confirmed => "CONFIRMED",
            ProviderPaymentStatus::Rejected => "REJECTED",
            ProviderPaymentStatus::Canceled => "CANCELED",
            ProviderPaymentStatus::Refunded => "REFUNDED",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "AUTHORIZED" => Some(ProviderPaymentStatus::Authorized),
            "CONFIRMED" => Some(ProviderPaymentStatus::Confirmed),
            "REJECTED" => Some(ProviderPaymentStatus::Rejected),
            "CANCELED" => Some(ProviderPaymentStatus::Canceled),
            "REFUNDED" => Some(ProviderPaymentStatus::Refunded),
            _ => None,
        }
    }
}
