use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::entities::payments::{InsertPaymentEntity, PaymentEntity};
use crate::value_objects::enums::payment_statuses::PaymentStatus;

#[automock]
#[async_trait]
pub trait PaymentRepository {
    /// Inserts the payment unless a row with the same idempotency key already
    /// exists, and returns the surviving row either way. This is the sole
    /// mechanism preventing duplicate charges under client retries.
    async fn create_if_absent(&self, payment: InsertPaymentEntity) -> Result<PaymentEntity>;

    async fn find_by_id(&self, payment_id: Uuid) -> Result<Option<PaymentEntity>>;

    async fn find_by_provider_payment_id(
        &self,
        provider_payment_id: &str,
    ) -> Result<Option<PaymentEntity>>;

    /// The completed booking payment of a session, if any.
    async fn find_completed_booking_payment(
        &self,
        session_id: Uuid,
    ) -> Result<Option<PaymentEntity>>;

    async fn set_provider_refs(
        &self,
        payment_id: Uuid,
        provider_payment_id: &str,
        payment_url: &str,
    ) -> Result<()>;

    async fn update_status(
        &self,
        payment_id: Uuid,
        status: PaymentStatus,
        error: Option<String>,
    ) -> Result<()>;
}
