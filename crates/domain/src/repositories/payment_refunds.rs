use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::entities::payment_refunds::{InsertPaymentRefundEntity, PaymentRefundEntity};

#[automock]
#[async_trait]
pub trait PaymentRefundRepository {
    /// Idempotency-keyed insert; an existing row is returned unchanged.
    async fn create_if_absent(
        &self,
        refund: InsertPaymentRefundEntity,
    ) -> Result<PaymentRefundEntity>;

    /// Refunds due for a provider attempt: non-terminal, `next_retry_at`
    /// reached, retry budget not exhausted.
    async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<PaymentRefundEntity>>;

    async fn mark_completed(&self, refund_id: Uuid, provider_refund_id: &str) -> Result<()>;

    /// Records a failed attempt and schedules the next one.
    async fn schedule_retry(
        &self,
        refund_id: Uuid,
        next_retry_at: DateTime<Utc>,
        error: &str,
    ) -> Result<()>;

    /// Terminal failure; surfaced for manual operator handling, never
    /// retried automatically again.
    async fn mark_failed(&self, refund_id: Uuid, error: &str) -> Result<()>;
}
