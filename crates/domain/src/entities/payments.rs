use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::payments;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = payments)]
pub struct PaymentEntity {
    pub id: Uuid,
    pub session_id: Uuid,
    pub amount_minor: i32,
    pub payment_type: String,
    pub status: String,
    pub idempotency_key: String,
    pub provider_payment_id: Option<String>,
    pub payment_url: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payments)]
pub struct InsertPaymentEntity {
    pub session_id: Uuid,
    pub amount_minor: i32,
    pub payment_type: String,
    pub status: String,
    pub idempotency_key: String,
    pub provider_payment_id: Option<String>,
    pub payment_url: Option<String>,
    pub error: Option<String>,
}
