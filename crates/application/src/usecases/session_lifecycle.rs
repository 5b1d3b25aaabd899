use std::sync::Arc;

use anyhow::anyhow;
use chrono::{Duration, Utc};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use domain::{
    entities::{payment_refunds::InsertPaymentRefundEntity, sessions::SessionEntity},
    repositories::{
        boxes::BoxRepository, payment_refunds::PaymentRefundRepository,
        payments::PaymentRepository, sessions::SessionRepository,
    },
    value_objects::{
        enums::{box_statuses::BoxStatus, refund_statuses::RefundStatus},
        notifications::NotificationKind,
    },
};

use crate::interfaces::{
    hardware::{HardwareController, HardwareError},
    notifications::NotificationSink,
};
use crate::settings::EngineSettings;

/// Coil register switching the box power circuit.
const POWER_COIL_REGISTER: u16 = 1;

const HARDWARE_ATTEMPTS: u32 = 3;
const HARDWARE_BACKOFF_SECS: u64 = 2;
const HARDWARE_COMPENSATION_MINUTES: i64 = 5;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found")]
    NotFound,
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl SessionError {
    pub fn status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            SessionError::NotFound => StatusCode::NOT_FOUND,
            SessionError::Validation(_) => StatusCode::BAD_REQUEST,
            SessionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;

#[derive(Debug)]
pub enum AssignOutcome {
    Assigned(SessionEntity),
    /// Lost the conditional reservation; the session stays queued.
    BoxTaken,
    /// The session left `in_queue` while we were reserving; the box was
    /// handed back.
    SessionMoved,
}

/// The only writer of session state. Every transition is guarded on the
/// expected source status; a lost guard is a safe no-op that returns the
/// current row, which makes each mutation idempotent and race-safe against
/// the background sweeps.
pub struct SessionLifecycleUseCase {
    session_repo: Arc<dyn SessionRepository + Send + Sync>,
    box_repo: Arc<dyn BoxRepository + Send + Sync>,
    payment_repo: Arc<dyn PaymentRepository + Send + Sync>,
    refund_repo: Arc<dyn PaymentRefundRepository + Send + Sync>,
    hardware: Arc<dyn HardwareController>,
    notifier: Arc<dyn NotificationSink>,
    settings: EngineSettings,
}

impl SessionLifecycleUseCase {
    pub fn new(
        session_repo: Arc<dyn SessionRepository + Send + Sync>,
        box_repo: Arc<dyn BoxRepository + Send + Sync>,
        payment_repo: Arc<dyn PaymentRepository + Send + Sync>,
        refund_repo: Arc<dyn PaymentRefundRepository + Send + Sync>,
        hardware: Arc<dyn HardwareController>,
        notifier: Arc<dyn NotificationSink>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            session_repo,
            box_repo,
            payment_repo,
            refund_repo,
            hardware,
            notifier,
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// `created` -> `in_queue`, driven by the payment-confirmed webhook.
    pub async fn enqueue_confirmed(&self, session_id: Uuid) -> SessionResult<SessionEntity> {
        match self.session_repo.mark_in_queue(session_id).await? {
            Some(session) => {
                info!(%session_id, "session entered the queue");
                Ok(session)
            }
            None => self.current_unchanged(session_id).await,
        }
    }

    /// `in_queue` -> `assigned`. Reserves the box first with a conditional
    /// `free -> reserved` write; only on success does the session transition.
    pub async fn assign_to_box(
        &self,
        session: &SessionEntity,
        box_id: Uuid,
        box_number: i32,
    ) -> SessionResult<AssignOutcome> {
        let reserved = self
            .box_repo
            .update_status_if(box_id, BoxStatus::Free, BoxStatus::Reserved)
            .await?;
        if !reserved {
            return Ok(AssignOutcome::BoxTaken);
        }

        match self
            .session_repo
            .assign_box(session.id, box_id, box_number)
            .await?
        {
            Some(updated) => {
                info!(
                    session_id = %updated.id,
                    box_number,
                    "session assigned to box"
                );
                self.notify(
                    updated.user_id,
                    NotificationKind::BoxAssigned { box_number },
                )
                .await;
                Ok(AssignOutcome::Assigned(updated))
            }
            None => {
                // The session moved on (canceled or expired) between the
                // queue read and the guarded update. Hand the box back.
                let released = self
                    .box_repo
                    .update_status_if(box_id, BoxStatus::Reserved, BoxStatus::Free)
                    .await?;
                if !released {
                    error!(session_id = %session.id, %box_id, "failed to roll back reservation");
                }
                Ok(AssignOutcome::SessionMoved)
            }
        }
    }

    /// `assigned` -> `active`, on explicit customer start. Switches the box
    /// coil on; a hardware failure never fails the start, it extends the
    /// session deadline as compensation instead.
    pub async fn start(&self, session_id: Uuid) -> SessionResult<SessionEntity> {
        let updated = match self.session_repo.mark_active(session_id).await? {
            Some(updated) => updated,
            None => return self.current_unchanged(session_id).await,
        };

        let box_id = updated
            .box_id
            .ok_or_else(|| anyhow!("active session {} has no box reference", updated.id))?;
        let box_number = updated
            .box_number
            .ok_or_else(|| anyhow!("active session {} has no box number", updated.id))?;

        let occupied = self
            .box_repo
            .update_status_if(box_id, BoxStatus::Reserved, BoxStatus::Busy)
            .await?;
        if !occupied {
            error!(%session_id, %box_id, "box was not reserved when the session started");
        }

        if let Err(err) = self.write_coil_with_retry(box_number, true).await {
            error!(
                %session_id,
                box_number,
                error = %err,
                "failed to power the box on; compensating with a deadline extension"
            );
            let anchor =
                updated.status_updated_at + Duration::minutes(HARDWARE_COMPENSATION_MINUTES);
            self.session_repo.push_deadline(updated.id, anchor).await?;
        }

        info!(%session_id, box_number, "session started");
        Ok(updated)
    }

    /// `active` -> `complete`, on explicit completion, an external exit
    /// signal, or the auto-complete sweep. Only the explicit path refunds
    /// unused time; the sweep treats the full window as used.
    pub async fn complete(&self, session_id: Uuid, auto: bool) -> SessionResult<SessionEntity> {
        let before = self
            .session_repo
            .find_by_id(session_id)
            .await?
            .ok_or(SessionError::NotFound)?;

        let updated = match self.session_repo.complete(session_id).await? {
            Some(updated) => updated,
            None => return self.current_unchanged(session_id).await,
        };

        if let (Some(box_id), Some(box_number)) = (before.box_id, before.box_number) {
            self.release_box(box_id, BoxStatus::Busy).await;

            if let Err(err) = self.write_coil_with_retry(box_number, false).await {
                error!(%session_id, box_number, error = %err, "failed to power the box off");
            }

            if auto {
                self.notify(
                    updated.user_id,
                    NotificationKind::SessionAutoCompleted { box_number },
                )
                .await;
            }
        } else {
            error!(%session_id, "completed session had no box reference");
        }

        if !auto {
            self.refund_unused_time(&before).await?;
        }

        info!(%session_id, auto, "session completed");
        Ok(updated)
    }

    /// `{created, in_queue, assigned}` -> `canceled`, on user or operator
    /// cancel. Refunds the full booking amount unless the payment never
    /// completed.
    pub async fn cancel(&self, session_id: Uuid) -> SessionResult<SessionEntity> {
        let before = self
            .session_repo
            .find_by_id(session_id)
            .await?
            .ok_or(SessionError::NotFound)?;

        let updated = match self.session_repo.cancel(session_id).await? {
            Some(updated) => updated,
            None => return self.current_unchanged(session_id).await,
        };

        if let Some(box_id) = before.box_id {
            self.release_box(box_id, BoxStatus::Reserved).await;
        }

        if let Some(payment) = self
            .payment_repo
            .find_completed_booking_payment(session_id)
            .await?
        {
            self.create_refund(
                payment.id,
                payment.amount_minor,
                format!("refund:full:{session_id}"),
            )
            .await?;
        }

        info!(%session_id, "session canceled");
        Ok(updated)
    }

    /// `assigned` -> `expired`, by the reservation timeout sweep.
    pub async fn expire_reservation(&self, session_id: Uuid) -> SessionResult<SessionEntity> {
        let before = self
            .session_repo
            .find_by_id(session_id)
            .await?
            .ok_or(SessionError::NotFound)?;

        let updated = match self.session_repo.expire(session_id).await? {
            Some(updated) => updated,
            None => return self.current_unchanged(session_id).await,
        };

        if let Some(box_id) = before.box_id {
            self.release_box(box_id, BoxStatus::Reserved).await;
        }

        self.notify(updated.user_id, NotificationKind::ReservationExpired)
            .await;

        info!(%session_id, "reservation expired");
        Ok(updated)
    }

    /// Non-terminal -> `payment_failed`, on a payment-failure webhook. Only
    /// reachable before a box was ever allocated; the repository guard
    /// restricts the source statuses accordingly.
    pub async fn fail_payment(&self, session_id: Uuid) -> SessionResult<SessionEntity> {
        match self.session_repo.mark_payment_failed(session_id).await? {
            Some(session) => {
                info!(%session_id, "session marked payment_failed");
                Ok(session)
            }
            None => self.current_unchanged(session_id).await,
        }
    }

    /// Folds a confirmed paid extension into the session's time window.
    pub async fn apply_confirmed_extension(&self, session_id: Uuid) -> SessionResult<SessionEntity> {
        match self.session_repo.apply_requested_extension(session_id).await? {
            Some(session) => {
                info!(
                    %session_id,
                    extension_time_minutes = session.extension_time_minutes,
                    "extension applied"
                );
                Ok(session)
            }
            None => self.current_unchanged(session_id).await,
        }
    }

    /// Drops a pending extension whose payment failed.
    pub async fn drop_requested_extension(&self, session_id: Uuid) -> SessionResult<SessionEntity> {
        match self.session_repo.clear_requested_extension(session_id).await? {
            Some(session) => Ok(session),
            None => self.current_unchanged(session_id).await,
        }
    }

    /// Creates a pending refund for the unused tail of an early-completed
    /// session. The refund retry sweep performs the provider call.
    async fn refund_unused_time(&self, before: &SessionEntity) -> SessionResult<()> {
        let payment = match self
            .payment_repo
            .find_completed_booking_payment(before.id)
            .await?
        {
            Some(payment) => payment,
            None => return Ok(()),
        };

        let total_minutes = before.total_time_minutes();
        if total_minutes <= 0 {
            return Ok(());
        }

        let elapsed_minutes = (Utc::now() - before.status_updated_at)
            .num_minutes()
            .clamp(0, total_minutes.into()) as i32;
        let unused_minutes = total_minutes - elapsed_minutes;
        if unused_minutes <= 0 {
            return Ok(());
        }

        let amount_minor =
            (payment.amount_minor as i64 * unused_minutes as i64 / total_minutes as i64) as i32;
        if amount_minor <= 0 {
            return Ok(());
        }

        info!(
            session_id = %before.id,
            unused_minutes,
            amount_minor,
            "scheduling unused-time refund"
        );
        self.create_refund(
            payment.id,
            amount_minor,
            format!("refund:unused:{}", before.id),
        )
        .await
    }

    async fn create_refund(
        &self,
        payment_id: Uuid,
        amount_minor: i32,
        idempotency_key: String,
    ) -> SessionResult<()> {
        self.refund_repo
            .create_if_absent(InsertPaymentRefundEntity {
                payment_id,
                amount_minor,
                status: RefundStatus::Pending.to_string(),
                retry_count: 0,
                max_retries: self.settings.refund_max_retries,
                next_retry_at: Utc::now(),
                idempotency_key,
                provider_refund_id: None,
                error: None,
            })
            .await?;
        Ok(())
    }

    /// Releases a box back to the pool and arms its cooldown.
    async fn release_box(&self, box_id: Uuid, expected: BoxStatus) {
        match self
            .box_repo
            .update_status_if(box_id, expected, BoxStatus::Free)
            .await
        {
            Ok(true) => {
                if self.settings.box_cooldown > Duration::zero() {
                    let until = Utc::now() + self.settings.box_cooldown;
                    if let Err(err) = self.box_repo.set_cooldown(box_id, until).await {
                        error!(%box_id, error = ?err, "failed to arm box cooldown");
                    }
                }
            }
            Ok(false) => {
                warn!(%box_id, expected = %expected, "box release lost its conditional update");
            }
            Err(err) => {
                error!(%box_id, error = ?err, "failed to release box");
            }
        }
    }

    async fn write_coil_with_retry(
        &self,
        box_number: i32,
        value: bool,
    ) -> Result<(), HardwareError> {
        let mut last_error = HardwareError::Timeout;
        for attempt in 1..=HARDWARE_ATTEMPTS {
            match self
                .hardware
                .write_coil(box_number, POWER_COIL_REGISTER, value)
                .await
            {
                Ok(()) => return Ok(()),
                Err(err) => {
                    warn!(box_number, attempt, error = %err, "coil write failed");
                    last_error = err;
                }
            }
            if attempt < HARDWARE_ATTEMPTS {
                tokio::time::sleep(std::time::Duration::from_secs(HARDWARE_BACKOFF_SECS)).await;
            }
        }
        Err(last_error)
    }

    async fn notify(&self, user_id: Uuid, kind: NotificationKind) {
        if let Err(err) = self.notifier.send(user_id, kind).await {
            warn!(%user_id, error = ?err, "notification delivery failed");
        }
    }

    /// Guard lost: the session is no longer in the expected source status.
    /// Re-read and hand the unchanged row back so retries stay no-ops.
    async fn current_unchanged(&self, session_id: Uuid) -> SessionResult<SessionEntity> {
        self.session_repo
            .find_by_id(session_id)
            .await?
            .ok_or(SessionError::NotFound)
    }
}
