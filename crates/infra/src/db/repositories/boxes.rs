use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::postgres::postgres_connection::PgPool;
use domain::{
    entities::boxes::BoxEntity,
    repositories::boxes::BoxRepository,
    schema::wash_boxes,
    value_objects::enums::{box_statuses::BoxStatus, service_types::ServiceType},
};

pub struct BoxPostgres {
    db_pool: Arc<PgPool>,
}

impl BoxPostgres {
    pub fn new(db_pool: Arc<PgPool>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl BoxRepository for BoxPostgres {
    async fn find_by_id(&self, box_id: Uuid) -> Result<Option<BoxEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = wash_boxes::table
            .find(box_id)
            .select(BoxEntity::as_select())
            .first::<BoxEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn list_free_by_service_type(
        &self,
        service_type: ServiceType,
        now: DateTime<Utc>,
    ) -> Result<Vec<BoxEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = wash_boxes::table
            .filter(wash_boxes::status.eq(BoxStatus::Free.to_string()))
            .filter(wash_boxes::service_type.eq(service_type.to_string()))
            .filter(
                wash_boxes::cooldown_until
                    .is_null()
                    .or(wash_boxes::cooldown_until.le(now)),
            )
            .select(BoxEntity::as_select())
            .load::<BoxEntity>(&mut conn)?;

        Ok(results)
    }

    async fn update_status_if(
        &self,
        box_id: Uuid,
        expected: BoxStatus,
        next: BoxStatus,
    ) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        // The WHERE clause carries the expected status, so concurrent writers
        // can never both win the same box.
        let rows = diesel::update(
            wash_boxes::table
                .filter(wash_boxes::id.eq(box_id))
                .filter(wash_boxes::status.eq(expected.to_string())),
        )
        .set((
            wash_boxes::status.eq(next.to_string()),
            wash_boxes::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)?;

        Ok(rows == 1)
    }

    async fn set_cooldown(&self, box_id: Uuid, until: DateTime<Utc>) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        diesel::update(wash_boxes::table.find(box_id))
            .set((
                wash_boxes::cooldown_until.eq(Some(until)),
                wash_boxes::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(())
    }
}
