use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::sessions::SessionEntity;
use crate::value_objects::enums::service_types::ServiceType;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookingModel {
    pub user_id: Uuid,
    pub service_type: ServiceType,
    pub with_chemistry: bool,
    pub rental_time_minutes: i32,
    pub idempotency_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestExtensionModel {
    pub minutes: i32,
    pub idempotency_key: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingConfirmationDto {
    pub session_id: Uuid,
    pub payment_id: Uuid,
    pub amount_minor: i32,
    pub payment_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionDto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub box_number: Option<i32>,
    pub status: String,
    pub service_type: String,
    pub with_chemistry: bool,
    pub rental_time_minutes: i32,
    pub extension_time_minutes: i32,
    pub requested_extension_minutes: i32,
    pub status_updated_at: DateTime<Utc>,
}

impl From<SessionEntity> for SessionDto {
    fn from(entity: SessionEntity) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            box_number: entity.box_number,
            status: entity.status,
            service_type: entity.service_type,
            with_chemistry: entity.with_chemistry,
            rental_time_minutes: entity.rental_time_minutes,
            extension_time_minutes: entity.extension_time_minutes,
            requested_extension_minutes: entity.requested_extension_minutes,
            status_updated_at: entity.status_updated_at,
        }
    }
}
