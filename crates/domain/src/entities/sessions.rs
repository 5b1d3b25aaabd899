use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::sessions;
use crate::value_objects::enums::session_statuses::SessionStatus;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = sessions)]
pub struct SessionEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub box_id: Option<Uuid>,
    pub box_number: Option<i32>,
    pub status: String,
    pub service_type: String,
    pub with_chemistry: bool,
    pub rental_time_minutes: i32,
    pub extension_time_minutes: i32,
    pub requested_extension_minutes: i32,
    pub status_updated_at: DateTime<Utc>,
    pub idempotency_key: String,
    pub reservation_warning_sent: bool,
    pub completion_warning_sent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionEntity {
    pub fn session_status(&self) -> Option<SessionStatus> {
        SessionStatus::from_str(&self.status)
    }

    /// Total paid time in minutes, base rental plus confirmed extensions.
    pub fn total_time_minutes(&self) -> i32 {
        self.rental_time_minutes + self.extension_time_minutes
    }

    /// Deadline of an `active` session, anchored at the last status change.
    pub fn active_deadline(&self) -> DateTime<Utc> {
        self.status_updated_at + Duration::minutes(self.total_time_minutes().into())
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = sessions)]
pub struct InsertSessionEntity {
    pub user_id: Uuid,
    pub status: String,
    pub service_type: String,
    pub with_chemistry: bool,
    pub rental_time_minutes: i32,
    pub extension_time_minutes: i32,
    pub requested_extension_minutes: i32,
    pub status_updated_at: DateTime<Utc>,
    pub idempotency_key: String,
    pub reservation_warning_sent: bool,
    pub completion_warning_sent: bool,
}
