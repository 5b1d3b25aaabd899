use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::postgres::postgres_connection::PgPool;
use domain::{
    entities::payment_refunds::{InsertPaymentRefundEntity, PaymentRefundEntity},
    repositories::payment_refunds::PaymentRefundRepository,
    schema::payment_refunds,
    value_objects::enums::refund_statuses::RefundStatus,
};

pub struct PaymentRefundPostgres {
    db_pool: Arc<PgPool>,
}

impl PaymentRefundPostgres {
    pub fn new(db_pool: Arc<PgPool>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PaymentRefundRepository for PaymentRefundPostgres {
    async fn create_if_absent(
        &self,
        refund: InsertPaymentRefundEntity,
    ) -> Result<PaymentRefundEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let key = refund.idempotency_key.clone();

        diesel::insert_into(payment_refunds::table)
            .values(&refund)
            .on_conflict(payment_refunds::idempotency_key)
            .do_nothing()
            .execute(&mut conn)?;

        payment_refunds::table
            .filter(payment_refunds::idempotency_key.eq(&key))
            .select(PaymentRefundEntity::as_select())
            .first::<PaymentRefundEntity>(&mut conn)
            .optional()?
            .ok_or_else(|| anyhow!("refund row vanished after idempotent insert: {key}"))
    }

    async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<PaymentRefundEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let retryable = vec![
            RefundStatus::Pending.to_string(),
            RefundStatus::Processing.to_string(),
        ];

        let results = payment_refunds::table
            .filter(payment_refunds::status.eq_any(retryable))
            .filter(payment_refunds::next_retry_at.le(now))
            .filter(payment_refunds::retry_count.lt(payment_refunds::max_retries))
            .order(payment_refunds::next_retry_at.asc())
            .select(PaymentRefundEntity::as_select())
            .load::<PaymentRefundEntity>(&mut conn)?;

        Ok(results)
    }

    async fn mark_completed(&self, refund_id: Uuid, provider_refund_id: &str) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        diesel::update(payment_refunds::table.find(refund_id))
            .set((
                payment_refunds::status.eq(RefundStatus::Completed.to_string()),
                payment_refunds::provider_refund_id.eq(Some(provider_refund_id)),
                payment_refunds::error.eq(None::<String>),
                payment_refunds::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn schedule_retry(
        &self,
        refund_id: Uuid,
        next_retry_at: DateTime<Utc>,
        error: &str,
    ) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        diesel::update(payment_refunds::table.find(refund_id))
            .set((
                payment_refunds::status.eq(RefundStatus::Processing.to_string()),
                payment_refunds::retry_count.eq(payment_refunds::retry_count + 1),
                payment_refunds::next_retry_at.eq(next_retry_at),
                payment_refunds::error.eq(Some(error)),
                payment_refunds::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn mark_failed(&self, refund_id: Uuid, error: &str) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        diesel::update(payment_refunds::table.find(refund_id))
            .set((
                payment_refunds::status.eq(RefundStatus::Failed.to_string()),
                payment_refunds::error.eq(Some(error)),
                payment_refunds::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(())
    }
}
