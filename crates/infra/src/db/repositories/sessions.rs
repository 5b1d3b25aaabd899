use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::postgres::postgres_connection::PgPool;
use domain::{
    entities::sessions::{InsertSessionEntity, SessionEntity},
    repositories::sessions::SessionRepository,
    schema::sessions,
    value_objects::enums::{service_types::ServiceType, session_statuses::SessionStatus},
};

pub struct SessionPostgres {
    db_pool: Arc<PgPool>,
}

impl SessionPostgres {
    pub fn new(db_pool: Arc<PgPool>) -> Self {
        Self { db_pool }
    }
}

fn terminal_statuses() -> Vec<String> {
    [
        SessionStatus::Complete,
        SessionStatus::Canceled,
        SessionStatus::Expired,
        SessionStatus::PaymentFailed,
    ]
    .iter()
    .map(|status| status.to_string())
    .collect()
}

#[async_trait]
impl SessionRepository for SessionPostgres {
    async fn create(&self, session: InsertSessionEntity) -> Result<SessionEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = diesel::insert_into(sessions::table)
            .values(&session)
            .returning(SessionEntity::as_select())
            .get_result::<SessionEntity>(&mut conn)?;

        Ok(result)
    }

    async fn find_by_id(&self, session_id: Uuid) -> Result<Option<SessionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = sessions::table
            .find(session_id)
            .select(SessionEntity::as_select())
            .first::<SessionEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<SessionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = sessions::table
            .filter(sessions::idempotency_key.eq(key))
            .select(SessionEntity::as_select())
            .first::<SessionEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn find_active_by_user(&self, user_id: Uuid) -> Result<Option<SessionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = sessions::table
            .filter(sessions::user_id.eq(user_id))
            .filter(sessions::status.ne_all(terminal_statuses()))
            .select(SessionEntity::as_select())
            .first::<SessionEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn list_by_status(&self, status: SessionStatus) -> Result<Vec<SessionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = sessions::table
            .filter(sessions::status.eq(status.to_string()))
            .order(sessions::status_updated_at.asc())
            .select(SessionEntity::as_select())
            .load::<SessionEntity>(&mut conn)?;

        Ok(results)
    }

    async fn list_queued_by_service_type(
        &self,
        service_type: ServiceType,
    ) -> Result<Vec<SessionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = sessions::table
            .filter(sessions::status.eq(SessionStatus::InQueue.to_string()))
            .filter(sessions::service_type.eq(service_type.to_string()))
            .order(sessions::status_updated_at.asc())
            .select(SessionEntity::as_select())
            .load::<SessionEntity>(&mut conn)?;

        Ok(results)
    }

    async fn mark_in_queue(&self, session_id: Uuid) -> Result<Option<SessionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let now = Utc::now();

        let result = diesel::update(
            sessions::table
                .filter(sessions::id.eq(session_id))
                .filter(sessions::status.eq(SessionStatus::Created.to_string())),
        )
        .set((
            sessions::status.eq(SessionStatus::InQueue.to_string()),
            sessions::status_updated_at.eq(now),
            sessions::updated_at.eq(now),
        ))
        .returning(SessionEntity::as_select())
        .get_result::<SessionEntity>(&mut conn)
        .optional()?;

        Ok(result)
    }

    async fn assign_box(
        &self,
        session_id: Uuid,
        box_id: Uuid,
        box_number: i32,
    ) -> Result<Option<SessionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let now = Utc::now();

        let result = diesel::update(
            sessions::table
                .filter(sessions::id.eq(session_id))
                .filter(sessions::status.eq(SessionStatus::InQueue.to_string())),
        )
        .set((
            sessions::status.eq(SessionStatus::Assigned.to_string()),
            sessions::box_id.eq(Some(box_id)),
            sessions::box_number.eq(Some(box_number)),
            sessions::status_updated_at.eq(now),
            sessions::reservation_warning_sent.eq(false),
            sessions::updated_at.eq(now),
        ))
        .returning(SessionEntity::as_select())
        .get_result::<SessionEntity>(&mut conn)
        .optional()?;

        Ok(result)
    }

    async fn mark_active(&self, session_id: Uuid) -> Result<Option<SessionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let now = Utc::now();

        let result = diesel::update(
            sessions::table
                .filter(sessions::id.eq(session_id))
                .filter(sessions::status.eq(SessionStatus::Assigned.to_string()))
                .filter(sessions::box_id.is_not_null()),
        )
        .set((
            sessions::status.eq(SessionStatus::Active.to_string()),
            sessions::status_updated_at.eq(now),
            sessions::completion_warning_sent.eq(false),
            sessions::updated_at.eq(now),
        ))
        .returning(SessionEntity::as_select())
        .get_result::<SessionEntity>(&mut conn)
        .optional()?;

        Ok(result)
    }

    async fn complete(&self, session_id: Uuid) -> Result<Option<SessionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let now = Utc::now();

        let result = diesel::update(
            sessions::table
                .filter(sessions::id.eq(session_id))
                .filter(sessions::status.eq(SessionStatus::Active.to_string())),
        )
        .set((
            sessions::status.eq(SessionStatus::Complete.to_string()),
            sessions::box_id.eq(None::<Uuid>),
            sessions::box_number.eq(None::<i32>),
            sessions::status_updated_at.eq(now),
            sessions::updated_at.eq(now),
        ))
        .returning(SessionEntity::as_select())
        .get_result::<SessionEntity>(&mut conn)
        .optional()?;

        Ok(result)
    }

    async fn expire(&self, session_id: Uuid) -> Result<Option<SessionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let now = Utc::now();

        let result = diesel::update(
            sessions::table
                .filter(sessions::id.eq(session_id))
                .filter(sessions::status.eq(SessionStatus::Assigned.to_string())),
        )
        .set((
            sessions::status.eq(SessionStatus::Expired.to_string()),
            sessions::box_id.eq(None::<Uuid>),
            sessions::box_number.eq(None::<i32>),
            sessions::status_updated_at.eq(now),
            sessions::updated_at.eq(now),
        ))
        .returning(SessionEntity::as_select())
        .get_result::<SessionEntity>(&mut conn)
        .optional()?;

        Ok(result)
    }

    async fn cancel(&self, session_id: Uuid) -> Result<Option<SessionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let now = Utc::now();
        let cancelable: Vec<String> = SessionStatus::cancelable()
            .iter()
            .map(|status| status.to_string())
            .collect();

        let result = diesel::update(
            sessions::table
                .filter(sessions::id.eq(session_id))
                .filter(sessions::status.eq_any(cancelable)),
        )
        .set((
            sessions::status.eq(SessionStatus::Canceled.to_string()),
            sessions::box_id.eq(None::<Uuid>),
            sessions::box_number.eq(None::<i32>),
            sessions::status_updated_at.eq(now),
            sessions::updated_at.eq(now),
        ))
        .returning(SessionEntity::as_select())
        .get_result::<SessionEntity>(&mut conn)
        .optional()?;

        Ok(result)
    }

    async fn mark_payment_failed(&self, session_id: Uuid) -> Result<Option<SessionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let now = Utc::now();
        // A box is only ever held from `assigned` onward, so this guard also
        // guarantees payment_failed sessions never trap a box.
        let eligible = vec![
            SessionStatus::Created.to_string(),
            SessionStatus::InQueue.to_string(),
        ];

        let result = diesel::update(
            sessions::table
                .filter(sessions::id.eq(session_id))
                .filter(sessions::status.eq_any(eligible)),
        )
        .set((
            sessions::status.eq(SessionStatus::PaymentFailed.to_string()),
            sessions::status_updated_at.eq(now),
            sessions::updated_at.eq(now),
        ))
        .returning(SessionEntity::as_select())
        .get_result::<SessionEntity>(&mut conn)
        .optional()?;

        Ok(result)
    }

    async fn set_requested_extension(
        &self,
        session_id: Uuid,
        minutes: i32,
    ) -> Result<Option<SessionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = diesel::update(
            sessions::table
                .filter(sessions::id.eq(session_id))
                .filter(sessions::status.eq(SessionStatus::Active.to_string())),
        )
        .set((
            sessions::requested_extension_minutes.eq(minutes),
            sessions::updated_at.eq(Utc::now()),
        ))
        .returning(SessionEntity::as_select())
        .get_result::<SessionEntity>(&mut conn)
        .optional()?;

        Ok(result)
    }

    async fn apply_requested_extension(&self, session_id: Uuid) -> Result<Option<SessionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = diesel::update(
            sessions::table
                .filter(sessions::id.eq(session_id))
                .filter(sessions::status.eq(SessionStatus::Active.to_string())),
        )
        .set((
            sessions::extension_time_minutes
                .eq(sessions::extension_time_minutes + sessions::requested_extension_minutes),
            sessions::requested_extension_minutes.eq(0),
            sessions::updated_at.eq(Utc::now()),
        ))
        .returning(SessionEntity::as_select())
        .get_result::<SessionEntity>(&mut conn)
        .optional()?;

        Ok(result)
    }

    async fn clear_requested_extension(&self, session_id: Uuid) -> Result<Option<SessionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = diesel::update(
            sessions::table
                .filter(sessions::id.eq(session_id))
                .filter(sessions::status.eq(SessionStatus::Active.to_string())),
        )
        .set((
            sessions::requested_extension_minutes.eq(0),
            sessions::updated_at.eq(Utc::now()),
        ))
        .returning(SessionEntity::as_select())
        .get_result::<SessionEntity>(&mut conn)
        .optional()?;

        Ok(result)
    }

    async fn push_deadline(&self, session_id: Uuid, anchor: DateTime<Utc>) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        diesel::update(sessions::table.find(session_id))
            .set((
                sessions::status_updated_at.eq(anchor),
                sessions::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn claim_reservation_warning(&self, session_id: Uuid) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let rows = diesel::update(
            sessions::table
                .filter(sessions::id.eq(session_id))
                .filter(sessions::status.eq(SessionStatus::Assigned.to_string()))
                .filter(sessions::reservation_warning_sent.eq(false)),
        )
        .set((
            sessions::reservation_warning_sent.eq(true),
            sessions::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)?;

        Ok(rows == 1)
    }

    async fn claim_completion_warning(&self, session_id: Uuid) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let rows = diesel::update(
            sessions::table
                .filter(sessions::id.eq(session_id))
                .filter(sessions::status.eq(SessionStatus::Active.to_string()))
                .filter(sessions::completion_warning_sent.eq(false)),
        )
        .set((
            sessions::completion_warning_sent.eq(true),
            sessions::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)?;

        Ok(rows == 1)
    }
}
