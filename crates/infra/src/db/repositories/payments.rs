use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::postgres::postgres_connection::PgPool;
use domain::{
    entities::payments::{InsertPaymentEntity, PaymentEntity},
    repositories::payments::PaymentRepository,
    schema::payments,
    value_objects::enums::{payment_statuses::PaymentStatus, payment_types::PaymentType},
};

pub struct PaymentPostgres {
    db_pool: Arc<PgPool>,
}

impl PaymentPostgres {
    pub fn new(db_pool: Arc<PgPool>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PaymentRepository for PaymentPostgres {
    async fn create_if_absent(&self, payment: InsertPaymentEntity) -> Result<PaymentEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let key = payment.idempotency_key.clone();

        // The unique constraint on the idempotency key resolves the race;
        // whoever lost the insert reads the winner's row back.
        diesel::insert_into(payments::table)
            .values(&payment)
            .on_conflict(payments::idempotency_key)
            .do_nothing()
            .execute(&mut conn)?;

        payments::table
            .filter(payments::idempotency_key.eq(&key))
            .select(PaymentEntity::as_select())
            .first::<PaymentEntity>(&mut conn)
            .optional()?
            .ok_or_else(|| anyhow!("payment row vanished after idempotent insert: {key}"))
    }

    async fn find_by_id(&self, payment_id: Uuid) -> Result<Option<PaymentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = payments::table
            .find(payment_id)
            .select(PaymentEntity::as_select())
            .first::<PaymentEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn find_by_provider_payment_id(
        &self,
        provider_payment_id: &str,
    ) -> Result<Option<PaymentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = payments::table
            .filter(payments::provider_payment_id.eq(provider_payment_id))
            .select(PaymentEntity::as_select())
            .first::<PaymentEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn find_completed_booking_payment(
        &self,
        session_id: Uuid,
    ) -> Result<Option<PaymentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = payments::table
            .filter(payments::session_id.eq(session_id))
            .filter(payments::payment_type.eq(PaymentType::Booking.to_string()))
            .filter(payments::status.eq(PaymentStatus::Completed.to_string()))
            .select(PaymentEntity::as_select())
            .first::<PaymentEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn set_provider_refs(
        &self,
        payment_id: Uuid,
        provider_payment_id: &str,
        payment_url: &str,
    ) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        diesel::update(payments::table.find(payment_id))
            .set((
                payments::provider_payment_id.eq(Some(provider_payment_id)),
                payments::payment_url.eq(Some(payment_url)),
                payments::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn update_status(
        &self,
        payment_id: Uuid,
        status: PaymentStatus,
        error: Option<String>,
    ) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        diesel::update(payments::table.find(payment_id))
            .set((
                payments::status.eq(status.to_string()),
                payments::error.eq(error),
                payments::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(())
    }
}
