use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::entities::sessions::{InsertSessionEntity, SessionEntity};
use crate::value_objects::enums::{service_types::ServiceType, session_statuses::SessionStatus};

/// Guarded mutation methods return `Ok(Some(updated))` when the source-status
/// precondition held, and `Ok(None)` when the session had already moved on.
/// A `None` is not an error; the caller re-reads and returns the row unchanged.
#[automock]
#[async_trait]
pub trait SessionRepository {
    async fn create(&self, session: InsertSessionEntity) -> Result<SessionEntity>;

    async fn find_by_id(&self, session_id: Uuid) -> Result<Option<SessionEntity>>;

    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<SessionEntity>>;

    /// The user's single non-terminal session, if any.
    async fn find_active_by_user(&self, user_id: Uuid) -> Result<Option<SessionEntity>>;

    async fn list_by_status(&self, status: SessionStatus) -> Result<Vec<SessionEntity>>;

    /// `in_queue` sessions of one service type, oldest enqueue first.
    async fn list_queued_by_service_type(
        &self,
        service_type: ServiceType,
    ) -> Result<Vec<SessionEntity>>;

    /// `created` -> `in_queue`.
    async fn mark_in_queue(&self, session_id: Uuid) -> Result<Option<SessionEntity>>;

    /// `in_queue` -> `assigned`; stores the box reference and clears the
    /// reservation warning flag.
    async fn assign_box(
        &self,
        session_id: Uuid,
        box_id: Uuid,
        box_number: i32,
    ) -> Result<Option<SessionEntity>>;

    /// `assigned` -> `active`; the guard also requires a box reference to be
    /// present. Clears the completion warning flag.
    async fn mark_active(&self, session_id: Uuid) -> Result<Option<SessionEntity>>;

    /// `active` -> `complete`; clears the box reference.
    async fn complete(&self, session_id: Uuid) -> Result<Option<SessionEntity>>;

    /// `assigned` -> `expired`; clears the box reference.
    async fn expire(&self, session_id: Uuid) -> Result<Option<SessionEntity>>;

    /// `{created, in_queue, assigned}` -> `canceled`; clears the box reference.
    async fn cancel(&self, session_id: Uuid) -> Result<Option<SessionEntity>>;

    /// `{created, in_queue}` -> `payment_failed`.
    async fn mark_payment_failed(&self, session_id: Uuid) -> Result<Option<SessionEntity>>;

    /// Stores a pending paid extension on an `active` session.
    async fn set_requested_extension(
        &self,
        session_id: Uuid,
        minutes: i32,
    ) -> Result<Option<SessionEntity>>;

    /// Folds the pending extension into `extension_time_minutes` on an
    /// `active` session and clears the pending field.
    async fn apply_requested_extension(&self, session_id: Uuid) -> Result<Option<SessionEntity>>;

    /// Drops a pending extension without applying it (failed extension payment).
    async fn clear_requested_extension(&self, session_id: Uuid) -> Result<Option<SessionEntity>>;

    /// Rewrites the deadline anchor; used for hardware-failure compensation.
    async fn push_deadline(&self, session_id: Uuid, anchor: DateTime<Utc>) -> Result<()>;

    /// Claims the one-shot reservation warning. Returns whether this caller
    /// won the claim (session still `assigned`, flag not yet set).
    async fn claim_reservation_warning(&self, session_id: Uuid) -> Result<bool>;

    /// Claims the one-shot completion warning for an `active` session.
    async fn claim_completion_warning(&self, session_id: Uuid) -> Result<bool>;
}
