use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::wash_boxes;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = wash_boxes)]
pub struct BoxEntity {
    pub id: Uuid,
    pub number: i32,
    pub status: String,
    pub service_type: String,
    pub has_chemistry: bool,
    pub priority_tier: i32,
    pub cooldown_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = wash_boxes)]
pub struct InsertBoxEntity {
    pub number: i32,
    pub status: String,
    pub service_type: String,
    pub has_chemistry: bool,
    pub priority_tier: i32,
    pub cooldown_until: Option<DateTime<Utc>>,
}
