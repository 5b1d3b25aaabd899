use anyhow::Result;
use async_trait::async_trait;
use diesel::prelude::*;
use std::sync::Arc;

use crate::db::postgres::postgres_connection::PgPool;
use domain::{
    entities::payment_events::InsertPaymentEventEntity,
    repositories::payment_events::PaymentEventRepository, schema::payment_events,
};

pub struct PaymentEventPostgres {
    db_pool: Arc<PgPool>,
}

impl PaymentEventPostgres {
    pub fn new(db_pool: Arc<PgPool>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PaymentEventRepository for PaymentEventPostgres {
    async fn record_if_new(&self, event: InsertPaymentEventEntity) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let rows = diesel::insert_into(payment_events::table)
            .values(&event)
            .on_conflict(payment_events::dedup_key)
            .do_nothing()
            .execute(&mut conn)?;

        Ok(rows == 1)
    }
}
