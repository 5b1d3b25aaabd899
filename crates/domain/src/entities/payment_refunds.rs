use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::payment_refunds;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = payment_refunds)]
pub struct PaymentRefundEntity {
    pub id: Uuid,
    pub payment_id: Uuid,
    pub amount_minor: i32,
    pub status: String,
    pub retry_count: i32,
    pub max_retries: i32,
    pub next_retry_at: DateTime<Utc>,
    pub idempotency_key: String,
    pub provider_refund_id: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payment_refunds)]
pub struct InsertPaymentRefundEntity {
    pub payment_id: Uuid,
    pub amount_minor: i32,
    pub status: String,
    pub retry_count: i32,
    pub max_retries: i32,
    pub next_retry_at: DateTime<Utc>,
    pub idempotency_key: String,
    pub provider_refund_id: Option<String>,
    pub error: Option<String>,
}
