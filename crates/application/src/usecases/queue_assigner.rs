use std::sync::Arc;

use chrono::Utc;
use rand::seq::SliceRandom;
use tracing::{debug, error, info};

use domain::{
    entities::{boxes::BoxEntity, sessions::SessionEntity},
    repositories::{boxes::BoxRepository, sessions::SessionRepository},
    value_objects::enums::service_types::ServiceType,
};

use crate::usecases::session_lifecycle::{AssignOutcome, SessionLifecycleUseCase};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct AssignmentStats {
    pub assigned: usize,
    pub waiting: usize,
}

/// Periodic matcher of `in_queue` sessions to free, eligible boxes. One
/// failing (session, type) pair never aborts the rest of the tick; the next
/// tick retries naturally.
pub struct QueueAssignerUseCase {
    session_repo: Arc<dyn SessionRepository + Send + Sync>,
    box_repo: Arc<dyn BoxRepository + Send + Sync>,
    lifecycle: Arc<SessionLifecycleUseCase>,
}

impl QueueAssignerUseCase {
    pub fn new(
        session_repo: Arc<dyn SessionRepository + Send + Sync>,
        box_repo: Arc<dyn BoxRepository + Send + Sync>,
        lifecycle: Arc<SessionLifecycleUseCase>,
    ) -> Self {
        Self {
            session_repo,
            box_repo,
            lifecycle,
        }
    }

    pub async fn tick(&self) -> AssignmentStats {
        let mut stats = AssignmentStats::default();

        for service_type in ServiceType::ALL {
            match self.assign_service_type(service_type).await {
                Ok(type_stats) => {
                    stats.assigned += type_stats.assigned;
                    stats.waiting += type_stats.waiting;
                }
                Err(err) => {
                    error!(
                        service_type = %service_type,
                        error = ?err,
                        "assignment tick failed for service type"
                    );
                }
            }
        }

        if stats.assigned > 0 {
            info!(
                assigned = stats.assigned,
                waiting = stats.waiting,
                "assignment tick finished"
            );
        }
        stats
    }

    async fn assign_service_type(
        &self,
        service_type: ServiceType,
    ) -> anyhow::Result<AssignmentStats> {
        let mut stats = AssignmentStats::default();

        let queued = self
            .session_repo
            .list_queued_by_service_type(service_type)
            .await?;
        if queued.is_empty() {
            return Ok(stats);
        }

        let free_boxes = self
            .box_repo
            .list_free_by_service_type(service_type, Utc::now())
            .await?;
        let mut candidates = order_candidates(free_boxes);

        for session in queued {
            let Some(index) = candidates.iter().position(|b| eligible(&session, b)) else {
                debug!(session_id = %session.id, "no eligible free box; session stays queued");
                stats.waiting += 1;
                continue;
            };
            let candidate = candidates.remove(index);

            match self
                .lifecycle
                .assign_to_box(&session, candidate.id, candidate.number)
                .await
            {
                Ok(AssignOutcome::Assigned(_)) => {
                    stats.assigned += 1;
                }
                Ok(AssignOutcome::BoxTaken) => {
                    // Lost the conditional update to a concurrent writer; the
                    // session keeps its queue position until the next tick.
                    stats.waiting += 1;
                }
                Ok(AssignOutcome::SessionMoved) => {
                    candidates.push(candidate);
                }
                Err(err) => {
                    error!(
                        session_id = %session.id,
                        box_number = candidate.number,
                        error = ?err,
                        "assignment failed; continuing with the remaining queue"
                    );
                    stats.waiting += 1;
                }
            }
        }

        Ok(stats)
    }
}

fn eligible(session: &SessionEntity, candidate: &BoxEntity) -> bool {
    !session.with_chemistry || candidate.has_chemistry
}

/// Highest priority tier first; uniformly shuffled within each tier on every
/// tick so wear spreads across boxes instead of always favoring the lowest
/// numbers.
fn order_candidates(mut boxes: Vec<BoxEntity>) -> Vec<BoxEntity> {
    let mut rng = rand::thread_rng();
    boxes.sort_by(|a, b| b.priority_tier.cmp(&a.priority_tier));

    let mut start = 0;
    while start < boxes.len() {
        let tier = boxes[start].priority_tier;
        let mut end = start + 1;
        while end < boxes.len() && boxes[end].priority_tier == tier {
            end += 1;
        }
        boxes[start..end].shuffle(&mut rng);
        start = end;
    }
    boxes
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use domain::repositories::boxes::MockBoxRepository;
    use domain::repositories::payment_refunds::MockPaymentRefundRepository;
    use domain::repositories::payments::MockPaymentRepository;
    use domain::repositories::sessions::MockSessionRepository;
    use domain::value_objects::enums::box_statuses::BoxStatus;
    use domain::value_objects::enums::session_statuses::SessionStatus;
    use mockall::predicate::eq;
    use uuid::Uuid;

    use crate::interfaces::hardware::MockHardwareController;
    use crate::interfaces::notifications::MockNotificationSink;
    use crate::settings::EngineSettings;

    fn queued_session(enqueued_at_offset_minutes: i64, with_chemistry: bool) -> SessionEntity {
        let now = Utc::now();
        SessionEntity {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            box_id: None,
            box_number: None,
            status: SessionStatus::InQueue.to_string(),
            service_type: "wash".to_string(),
            with_chemistry,
            rental_time_minutes: 30,
            extension_time_minutes: 0,
            requested_extension_minutes: 0,
            status_updated_at: now - Duration::minutes(enqueued_at_offset_minutes),
            idempotency_key: Uuid::new_v4().to_string(),
            reservation_warning_sent: false,
            completion_warning_sent: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn free_box(number: i32, has_chemistry: bool, priority_tier: i32) -> BoxEntity {
        let now = Utc::now();
        BoxEntity {
            id: Uuid::new_v4(),
            number,
            status: BoxStatus::Free.to_string(),
            service_type: "wash".to_string(),
            has_chemistry,
            priority_tier,
            cooldown_until: None,
            created_at: now,
            updated_at: now,
        }
    }

    struct Fixture {
        sessions: MockSessionRepository,
        boxes: MockBoxRepository,
        lifecycle_sessions: MockSessionRepository,
        lifecycle_boxes: MockBoxRepository,
        notifier: MockNotificationSink,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                sessions: MockSessionRepository::new(),
                boxes: MockBoxRepository::new(),
                lifecycle_sessions: MockSessionRepository::new(),
                lifecycle_boxes: MockBoxRepository::new(),
                notifier: MockNotificationSink::new(),
            }
        }

        fn into_usecase(mut self) -> QueueAssignerUseCase {
            self.notifier.expect_send().returning(|_, _| Ok(()));
            let lifecycle = Arc::new(SessionLifecycleUseCase::new(
                Arc::new(self.lifecycle_sessions),
                Arc::new(self.lifecycle_boxes),
                Arc::new(MockPaymentRepository::new()),
                Arc::new(MockPaymentRefundRepository::new()),
                Arc::new(MockHardwareController::new()),
                Arc::new(self.notifier),
                EngineSettings::default(),
            ));
            QueueAssignerUseCase::new(Arc::new(self.sessions), Arc::new(self.boxes), lifecycle)
        }
    }

    #[tokio::test]
    async fn assigns_oldest_sessions_first_until_boxes_run_out() {
        let mut fixture = Fixture::new();
        let oldest = queued_session(10, false);
        let newer = queued_session(2, false);
        let only_box = free_box(1, false, 1);
        let oldest_id = oldest.id;
        let box_id = only_box.id;

        fixture
            .sessions
            .expect_list_queued_by_service_type()
            .returning(move |service_type| {
                if service_type == ServiceType::Wash {
                    Ok(vec![oldest.clone(), newer.clone()])
                } else {
                    Ok(vec![])
                }
            });
        fixture
            .boxes
            .expect_list_free_by_service_type()
            .returning(move |_, _| Ok(vec![only_box.clone()]));

        fixture
            .lifecycle_boxes
            .expect_update_status_if()
            .with(eq(box_id), eq(BoxStatus::Free), eq(BoxStatus::Reserved))
            .times(1)
            .returning(|_, _, _| Ok(true));
        fixture
            .lifecycle_sessions
            .expect_assign_box()
            .withf(move |session_id, _, _| *session_id == oldest_id)
            .times(1)
            .returning(|session_id, box_id, box_number| {
                let mut assigned = queued_session(0, false);
                assigned.id = session_id;
                assigned.status = SessionStatus::Assigned.to_string();
                assigned.box_id = Some(box_id);
                assigned.box_number = Some(box_number);
                Ok(Some(assigned))
            });

        let stats = fixture.into_usecase().tick().await;

        assert_eq!(stats.assigned, 1);
        assert_eq!(stats.waiting, 1);
    }

    #[tokio::test]
    async fn chemistry_sessions_only_match_chemistry_boxes() {
        let mut fixture = Fixture::new();
        let session = queued_session(5, true);
        let plain_box = free_box(1, false, 1);
        let chem_box = free_box(2, true, 1);
        let chem_box_id = chem_box.id;

        fixture
            .sessions
            .expect_list_queued_by_service_type()
            .returning(move |service_type| {
                if service_type == ServiceType::Wash {
                    Ok(vec![session.clone()])
                } else {
                    Ok(vec![])
                }
            });
        fixture
            .boxes
            .expect_list_free_by_service_type()
            .returning(move |_, _| Ok(vec![plain_box.clone(), chem_box.clone()]));

        fixture
            .lifecycle_boxes
            .expect_update_status_if()
            .withf(move |box_id, expected, next| {
                *box_id == chem_box_id
                    && *expected == BoxStatus::Free
                    && *next == BoxStatus::Reserved
            })
            .times(1)
            .returning(|_, _, _| Ok(true));
        fixture
            .lifecycle_sessions
            .expect_assign_box()
            .times(1)
            .returning(|session_id, box_id, box_number| {
                let mut assigned = queued_session(0, true);
                assigned.id = session_id;
                assigned.status = SessionStatus::Assigned.to_string();
                assigned.box_id = Some(box_id);
                assigned.box_number = Some(box_number);
                Ok(Some(assigned))
            });

        let stats = fixture.into_usecase().tick().await;

        assert_eq!(stats.assigned, 1);
    }

    #[tokio::test]
    async fn a_lost_reservation_race_leaves_the_session_queued() {
        let mut fixture = Fixture::new();
        let session = queued_session(5, false);
        let contested_box = free_box(1, false, 1);

        fixture
            .sessions
            .expect_list_queued_by_service_type()
            .returning(move |service_type| {
                if service_type == ServiceType::Wash {
                    Ok(vec![session.clone()])
                } else {
                    Ok(vec![])
                }
            });
        fixture
            .boxes
            .expect_list_free_by_service_type()
            .returning(move |_, _| Ok(vec![contested_box.clone()]));

        fixture
            .lifecycle_boxes
            .expect_update_status_if()
            .times(1)
            .returning(|_, _, _| Ok(false));
        // No assign_box expectation: the session must not transition after a
        // lost conditional update.

        let stats = fixture.into_usecase().tick().await;

        assert_eq!(stats.assigned, 0);
        assert_eq!(stats.waiting, 1);
    }

    #[tokio::test]
    async fn higher_priority_tiers_are_preferred() {
        let mut fixture = Fixture::new();
        let session = queued_session(5, false);
        let low_tier = free_box(1, false, 1);
        let high_tier = free_box(2, false, 3);
        let high_tier_id = high_tier.id;

        fixture
            .sessions
            .expect_list_queued_by_service_type()
            .returning(move |service_type| {
                if service_type == ServiceType::Wash {
                    Ok(vec![session.clone()])
                } else {
                    Ok(vec![])
                }
            });
        fixture
            .boxes
            .expect_list_free_by_service_type()
            .returning(move |_, _| Ok(vec![low_tier.clone(), high_tier.clone()]));

        fixture
            .lifecycle_boxes
            .expect_update_status_if()
            .withf(move |box_id, _, _| *box_id == high_tier_id)
            .times(1)
            .returning(|_, _, _| Ok(true));
        fixture
            .lifecycle_sessions
            .expect_assign_box()
            .times(1)
            .returning(|session_id, box_id, box_number| {
                let mut assigned = queued_session(0, false);
                assigned.id = session_id;
                assigned.status = SessionStatus::Assigned.to_string();
                assigned.box_id = Some(box_id);
                assigned.box_number = Some(box_number);
                Ok(Some(assigned))
            });

        let stats = fixture.into_usecase().tick().await;

        assert_eq!(stats.assigned, 1);
    }
}
