use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::entities::boxes::BoxEntity;
use crate::value_objects::enums::{box_statuses::BoxStatus, service_types::ServiceType};

#[automock]
#[async_trait]
pub trait BoxRepository {
    async fn find_by_id(&self, box_id: Uuid) -> Result<Option<BoxEntity>>;

    /// Free boxes of the given service type whose cooldown has elapsed.
    /// Chemistry filtering happens per session at the call site.
    async fn list_free_by_service_type(
        &self,
        service_type: ServiceType,
        now: DateTime<Utc>,
    ) -> Result<Vec<BoxEntity>>;

    /// Conditional status update: succeeds only if the box is still in
    /// `expected`. Returns whether the write won.
    async fn update_status_if(
        &self,
        box_id: Uuid,
        expected: BoxStatus,
        next: BoxStatus,
    ) -> Result<bool>;

    async fn set_cooldown(&self, box_id: Uuid, until: DateTime<Utc>) -> Result<()>;
}
