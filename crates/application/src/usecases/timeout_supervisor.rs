use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use domain::{
    entities::sessions::SessionEntity,
    repositories::sessions::SessionRepository,
    value_objects::{
        enums::session_statuses::SessionStatus, notifications::NotificationKind,
    },
};

use crate::interfaces::notifications::NotificationSink;
use crate::settings::EngineSettings;
use crate::usecases::session_lifecycle::SessionLifecycleUseCase;

/// Independent periodic sweeps enforcing deadlines without external triggers.
/// Stateless and safe to run concurrently with the assigner and with
/// user-triggered transitions: conflicting writers can never both succeed on
/// one session because the loser's status guard fails on re-read.
pub struct TimeoutSupervisorUseCase {
    session_repo: Arc<dyn SessionRepository + Send + Sync>,
    lifecycle: Arc<SessionLifecycleUseCase>,
    notifier: Arc<dyn NotificationSink>,
    settings: EngineSettings,
}

impl TimeoutSupervisorUseCase {
    pub fn new(
        session_repo: Arc<dyn SessionRepository + Send + Sync>,
        lifecycle: Arc<SessionLifecycleUseCase>,
        notifier: Arc<dyn NotificationSink>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            session_repo,
            lifecycle,
            notifier,
            settings,
        }
    }

    /// Expires every `assigned` session whose reservation window has passed.
    pub async fn expire_stale_reservations(&self, now: DateTime<Utc>) -> usize {
        let assigned = match self.session_repo.list_by_status(SessionStatus::Assigned).await {
            Ok(sessions) => sessions,
            Err(err) => {
                error!(error = ?err, "failed to list assigned sessions");
                return 0;
            }
        };

        let mut expired = 0;
        for session in assigned {
            if now - session.status_updated_at < self.settings.reservation_timeout {
                continue;
            }
            match self.lifecycle.expire_reservation(session.id).await {
                Ok(_) => expired += 1,
                Err(err) => {
                    error!(session_id = %session.id, error = %err, "failed to expire reservation");
                }
            }
        }

        if expired > 0 {
            info!(expired, "reservation sweep finished");
        }
        expired
    }

    /// Completes every `active` session whose paid window has elapsed. The
    /// full window counts as used; this path never refunds.
    pub async fn auto_complete_elapsed(&self, now: DateTime<Utc>) -> usize {
        let active = match self.session_repo.list_by_status(SessionStatus::Active).await {
            Ok(sessions) => sessions,
            Err(err) => {
                error!(error = ?err, "failed to list active sessions");
                return 0;
            }
        };

        let mut completed = 0;
        for session in active {
            if now < session.active_deadline() {
                continue;
            }
            match self.lifecycle.complete(session.id, true).await {
                Ok(_) => completed += 1,
                Err(err) => {
                    error!(session_id = %session.id, error = %err, "failed to auto-complete session");
                }
            }
        }

        if completed > 0 {
            info!(completed, "auto-complete sweep finished");
        }
        completed
    }

    /// Fires the one-shot T−1-minute warnings for both deadlines. The
    /// per-session flag claim is itself a guarded update, so two concurrent
    /// sweeps deliver at most one message.
    pub async fn send_deadline_warnings(&self, now: DateTime<Utc>) -> usize {
        let mut sent = 0;
        sent += self.warn_assigned(now).await;
        sent += self.warn_active(now).await;
        sent
    }

    async fn warn_assigned(&self, now: DateTime<Utc>) -> usize {
        let assigned = match self.session_repo.list_by_status(SessionStatus::Assigned).await {
            Ok(sessions) => sessions,
            Err(err) => {
                error!(error = ?err, "failed to list assigned sessions for warnings");
                return 0;
            }
        };

        let mut sent = 0;
        for session in assigned {
            if session.reservation_warning_sent {
                continue;
            }
            let deadline = session.status_updated_at + self.settings.reservation_timeout;
            if !in_warning_window(now, deadline, self.settings.warning_lead) {
                continue;
            }
            match self.session_repo.claim_reservation_warning(session.id).await {
                Ok(true) => {
                    self.deliver(
                        &session,
                        NotificationKind::ReservationExpiringSoon {
                            box_number: session.box_number.unwrap_or_default(),
                        },
                    )
                    .await;
                    sent += 1;
                }
                Ok(false) => {}
                Err(err) => {
                    error!(session_id = %session.id, error = ?err, "failed to claim reservation warning");
                }
            }
        }
        sent
    }

    async fn warn_active(&self, now: DateTime<Utc>) -> usize {
        let active = match self.session_repo.list_by_status(SessionStatus::Active).await {
            Ok(sessions) => sessions,
            Err(err) => {
                error!(error = ?err, "failed to list active sessions for warnings");
                return 0;
            }
        };

        let mut sent = 0;
        for session in active {
            if session.completion_warning_sent {
                continue;
            }
            if !in_warning_window(now, session.active_deadline(), self.settings.warning_lead) {
                continue;
            }
            match self.session_repo.claim_completion_warning(session.id).await {
                Ok(true) => {
                    self.deliver(
                        &session,
                        NotificationKind::SessionExpiringSoon {
                            box_number: session.box_number.unwrap_or_default(),
                        },
                    )
                    .await;
                    sent += 1;
                }
                Ok(false) => {}
                Err(err) => {
                    error!(session_id = %session.id, error = ?err, "failed to claim completion warning");
                }
            }
        }
        sent
    }

    async fn deliver(&self, session: &SessionEntity, kind: NotificationKind) {
        if let Err(err) = self.notifier.send(session.user_id, kind).await {
            warn!(session_id = %session.id, error = ?err, "warning delivery failed");
        }
    }
}

fn in_warning_window(
    now: DateTime<Utc>,
    deadline: DateTime<Utc>,
    lead: chrono::Duration,
) -> bool {
    now >= deadline - lead && now < deadline
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use domain::entities::sessions::SessionEntity;
    use domain::repositories::boxes::MockBoxRepository;
    use domain::repositories::payment_refunds::MockPaymentRefundRepository;
    use domain::repositories::payments::MockPaymentRepository;
    use domain::repositories::sessions::MockSessionRepository;
    use domain::value_objects::enums::box_statuses::BoxStatus;
    use mockall::predicate::eq;
    use uuid::Uuid;

    use crate::interfaces::hardware::MockHardwareController;
    use crate::interfaces::notifications::MockNotificationSink;

    fn assigned_session(age_minutes: i64) -> SessionEntity {
        let now = Utc::now();
        SessionEntity {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            box_id: Some(Uuid::new_v4()),
            box_number: Some(4),
            status: SessionStatus::Assigned.to_string(),
            service_type: "wash".to_string(),
            with_chemistry: false,
            rental_time_minutes: 30,
            extension_time_minutes: 0,
            requested_extension_minutes: 0,
            status_updated_at: now - Duration::minutes(age_minutes),
            idempotency_key: Uuid::new_v4().to_string(),
            reservation_warning_sent: false,
            completion_warning_sent: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn active_session(age_minutes: i64, rental_minutes: i32) -> SessionEntity {
        let mut session = assigned_session(age_minutes);
        session.status = SessionStatus::Active.to_string();
        session.rental_time_minutes = rental_minutes;
        session
    }

    struct Fixture {
        sessions: MockSessionRepository,
        notifier: MockNotificationSink,
        lifecycle_sessions: MockSessionRepository,
        lifecycle_boxes: MockBoxRepository,
        lifecycle_payments: MockPaymentRepository,
        lifecycle_hardware: MockHardwareController,
        lifecycle_notifier: MockNotificationSink,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                sessions: MockSessionRepository::new(),
                notifier: MockNotificationSink::new(),
                lifecycle_sessions: MockSessionRepository::new(),
                lifecycle_boxes: MockBoxRepository::new(),
                lifecycle_payments: MockPaymentRepository::new(),
                lifecycle_hardware: MockHardwareController::new(),
                lifecycle_notifier: MockNotificationSink::new(),
            }
        }

        fn into_usecase(self) -> TimeoutSupervisorUseCase {
            let lifecycle = Arc::new(SessionLifecycleUseCase::new(
                Arc::new(self.lifecycle_sessions),
                Arc::new(self.lifecycle_boxes),
                Arc::new(self.lifecycle_payments),
                Arc::new(MockPaymentRefundRepository::new()),
                Arc::new(self.lifecycle_hardware),
                Arc::new(self.lifecycle_notifier),
                EngineSettings::default(),
            ));
            TimeoutSupervisorUseCase::new(
                Arc::new(self.sessions),
                lifecycle,
                Arc::new(self.notifier),
                EngineSettings::default(),
            )
        }
    }

    #[tokio::test]
    async fn stale_reservations_expire_and_fresh_ones_survive() {
        let mut fixture = Fixture::new();
        let stale = assigned_session(5);
        let fresh = assigned_session(1);
        let stale_id = stale.id;
        let stale_box_id = stale.box_id.unwrap();

        let listed = vec![stale.clone(), fresh.clone()];
        fixture
            .sessions
            .expect_list_by_status()
            .with(eq(SessionStatus::Assigned))
            .returning(move |_| Ok(listed.clone()));

        let before = stale.clone();
        fixture
            .lifecycle_sessions
            .expect_find_by_id()
            .with(eq(stale_id))
            .returning(move |_| Ok(Some(before.clone())));
        let mut expired = stale.clone();
        expired.status = SessionStatus::Expired.to_string();
        expired.box_id = None;
        expired.box_number = None;
        fixture
            .lifecycle_sessions
            .expect_expire()
            .with(eq(stale_id))
            .times(1)
            .returning(move |_| Ok(Some(expired.clone())));
        fixture
            .lifecycle_boxes
            .expect_update_status_if()
            .with(eq(stale_box_id), eq(BoxStatus::Reserved), eq(BoxStatus::Free))
            .times(1)
            .returning(|_, _, _| Ok(true));
        fixture
            .lifecycle_notifier
            .expect_send()
            .returning(|_, _| Ok(()));

        let expired_count = fixture
            .into_usecase()
            .expire_stale_reservations(Utc::now())
            .await;

        assert_eq!(expired_count, 1);
    }

    #[tokio::test]
    async fn elapsed_active_sessions_are_auto_completed() {
        let mut fixture = Fixture::new();
        let elapsed = active_session(31, 30);
        let running = active_session(10, 30);
        let elapsed_id = elapsed.id;

        let listed = vec![elapsed.clone(), running.clone()];
        fixture
            .sessions
            .expect_list_by_status()
            .with(eq(SessionStatus::Active))
            .returning(move |_| Ok(listed.clone()));

        let before = elapsed.clone();
        fixture
            .lifecycle_sessions
            .expect_find_by_id()
            .with(eq(elapsed_id))
            .returning(move |_| Ok(Some(before.clone())));
        let mut finished = elapsed.clone();
        finished.status = SessionStatus::Complete.to_string();
        fixture
            .lifecycle_sessions
            .expect_complete()
            .with(eq(elapsed_id))
            .times(1)
            .returning(move |_| Ok(Some(finished.clone())));
        fixture
            .lifecycle_boxes
            .expect_update_status_if()
            .returning(|_, _, _| Ok(true));
        fixture
            .lifecycle_hardware
            .expect_write_coil()
            .returning(|_, _, _| Ok(()));
        fixture
            .lifecycle_notifier
            .expect_send()
            .returning(|_, _| Ok(()));

        let completed = fixture
            .into_usecase()
            .auto_complete_elapsed(Utc::now())
            .await;

        assert_eq!(completed, 1);
    }

    #[tokio::test]
    async fn reservation_warning_fires_once_inside_the_window() {
        let mut fixture = Fixture::new();
        // 2.5 minutes into a 3-minute reservation: inside the T-1 window.
        let mut nearly_due = assigned_session(0);
        nearly_due.status_updated_at = Utc::now() - Duration::seconds(150);
        let session_id = nearly_due.id;

        let assigned_list = vec![nearly_due.clone()];
        fixture
            .sessions
            .expect_list_by_status()
            .with(eq(SessionStatus::Assigned))
            .returning(move |_| Ok(assigned_list.clone()));
        fixture
            .sessions
            .expect_list_by_status()
            .with(eq(SessionStatus::Active))
            .returning(|_| Ok(vec![]));
        fixture
            .sessions
            .expect_claim_reservation_warning()
            .with(eq(session_id))
            .times(1)
            .returning(|_| Ok(true));
        fixture
            .notifier
            .expect_send()
            .withf(|_, kind| {
                matches!(kind, NotificationKind::ReservationExpiringSoon { box_number: 4 })
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let sent = fixture
            .into_usecase()
            .send_deadline_warnings(Utc::now())
            .await;

        assert_eq!(sent, 1);
    }

    #[tokio::test]
    async fn an_already_flagged_session_is_not_warned_again() {
        let mut fixture = Fixture::new();
        let mut warned = assigned_session(0);
        warned.status_updated_at = Utc::now() - Duration::seconds(150);
        warned.reservation_warning_sent = true;

        let assigned_list = vec![warned.clone()];
        fixture
            .sessions
            .expect_list_by_status()
            .with(eq(SessionStatus::Assigned))
            .returning(move |_| Ok(assigned_list.clone()));
        fixture
            .sessions
            .expect_list_by_status()
            .with(eq(SessionStatus::Active))
            .returning(|_| Ok(vec![]));
        // Neither the flag claim nor the sink may be touched.

        let sent = fixture
            .into_usecase()
            .send_deadline_warnings(Utc::now())
            .await;

        assert_eq!(sent, 0);
    }

    #[tokio::test]
    async fn a_lost_flag_claim_suppresses_the_duplicate_warning() {
        let mut fixture = Fixture::new();
        let mut nearly_due = assigned_session(0);
        nearly_due.status_updated_at = Utc::now() - Duration::seconds(150);

        let assigned_list = vec![nearly_due.clone()];
        fixture
            .sessions
            .expect_list_by_status()
            .with(eq(SessionStatus::Assigned))
            .returning(move |_| Ok(assigned_list.clone()));
        fixture
            .sessions
            .expect_list_by_status()
            .with(eq(SessionStatus::Active))
            .returning(|_| Ok(vec![]));
        fixture
            .sessions
            .expect_claim_reservation_warning()
            .times(1)
            .returning(|_| Ok(false));
        // A concurrent sweep won the flag; no message from this one.

        let sent = fixture
            .into_usecase()
            .send_deadline_warnings(Utc::now())
            .await;

        assert_eq!(sent, 0);
    }
}
