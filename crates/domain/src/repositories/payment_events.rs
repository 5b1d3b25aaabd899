use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::entities::payment_events::InsertPaymentEventEntity;

#[automock]
#[async_trait]
pub trait PaymentEventRepository {
    /// Appends the event unless its dedup key is already present. Returns
    /// `true` when this call inserted the row, `false` on a replay.
    async fn record_if_new(&self, event: InsertPaymentEventEntity) -> Result<bool>;
}
