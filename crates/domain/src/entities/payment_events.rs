use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::schema::payment_events;

/// Append-only record of an applied external payment effect. The unique
/// `dedup_key` is the single source of truth for "has this effect already
/// been applied".
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = payment_events)]
pub struct PaymentEventEntity {
    pub id: Uuid,
    pub payment_id: Option<Uuid>,
    pub provider_payment_id: String,
    pub event_status: String,
    pub dedup_key: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payment_events)]
pub struct InsertPaymentEventEntity {
    pub payment_id: Option<Uuid>,
    pub provider_payment_id: String,
    pub event_status: String,
    pub dedup_key: String,
    pub payload: Value,
}
