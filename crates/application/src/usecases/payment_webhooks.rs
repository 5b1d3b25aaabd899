use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use domain::{
    entities::{payment_events::InsertPaymentEventEntity, payments::PaymentEntity},
    repositories::{payment_events::PaymentEventRepository, payments::PaymentRepository},
    value_objects::{
        enums::{payment_statuses::PaymentStatus, payment_types::PaymentType},
        payment_webhook::{PaymentWebhook, ProviderPaymentStatus},
    },
};

use crate::interfaces::payment_gateway::PaymentGateway;
use crate::usecases::session_lifecycle::SessionLifecycleUseCase;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("invalid webhook: {0}")]
    Invalid(String),
    #[error("no payment matches the webhook")]
    UnknownPayment,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl WebhookError {
    pub fn status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            WebhookError::Invalid(_) => StatusCode::BAD_REQUEST,
            WebhookError::UnknownPayment => StatusCode::NOT_FOUND,
            WebhookError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum WebhookOutcome {
    Applied {
        payment_id: Uuid,
        status: ProviderPaymentStatus,
    },
    /// The dedup key already existed; nothing was re-applied.
    Duplicate,
}

/// End-to-end application of one provider callback: verify the signature,
/// dedup against the event ledger, record the status, drive the session
/// transition. Each persisted step is idempotent on its own, so an abandoned
/// half-applied delivery converges on the provider's redelivery.
pub struct PaymentWebhookUseCase {
    payment_repo: Arc<dyn PaymentRepository + Send + Sync>,
    event_repo: Arc<dyn PaymentEventRepository + Send + Sync>,
    lifecycle: Arc<SessionLifecycleUseCase>,
    gateway: Arc<dyn PaymentGateway>,
}

impl PaymentWebhookUseCase {
    pub fn new(
        payment_repo: Arc<dyn PaymentRepository + Send + Sync>,
        event_repo: Arc<dyn PaymentEventRepository + Send + Sync>,
        lifecycle: Arc<SessionLifecycleUseCase>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            payment_repo,
            event_repo,
            lifecycle,
            gateway,
        }
    }

    pub async fn process(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookOutcome, WebhookError> {
        let webhook = self
            .gateway
            .verify_webhook(payload, signature)
            .map_err(|err| {
                warn!(error = %err, "webhook rejected before processing");
                WebhookError::Invalid(err.to_string())
            })?;

        let payment = self.resolve_payment(&webhook).await?;

        let event = InsertPaymentEventEntity {
            payment_id: Some(payment.id),
            provider_payment_id: webhook.provider_payment_id.clone(),
            event_status: webhook.status.as_str().to_string(),
            dedup_key: webhook.dedup_key(),
            payload: serde_json::to_value(&webhook).map_err(anyhow::Error::from)?,
        };
        if !self.event_repo.record_if_new(event).await? {
            info!(
                payment_id = %payment.id,
                status = webhook.status.as_str(),
                "webhook replay suppressed by dedup key"
            );
            return Ok(WebhookOutcome::Duplicate);
        }

        self.apply(&payment, &webhook).await?;

        info!(
            payment_id = %payment.id,
            session_id = %payment.session_id,
            status = webhook.status.as_str(),
            "webhook applied"
        );
        Ok(WebhookOutcome::Applied {
            payment_id: payment.id,
            status: webhook.status,
        })
    }

    async fn resolve_payment(
        &self,
        webhook: &PaymentWebhook,
    ) -> Result<PaymentEntity, WebhookError> {
        if let Some(payment) = self
            .payment_repo
            .find_by_provider_payment_id(&webhook.provider_payment_id)
            .await?
        {
            return Ok(payment);
        }
        // Early callbacks can race the Init response write; the order id we
        // hand the provider is the payment id.
        self.payment_repo
            .find_by_id(webhook.order_id)
            .await?
            .ok_or(WebhookError::UnknownPayment)
    }

    async fn apply(
        &self,
        payment: &PaymentEntity,
        webhook: &PaymentWebhook,
    ) -> Result<(), WebhookError> {
        let payment_type = PaymentType::from_str(&payment.payment_type);

        match webhook.status {
            ProviderPaymentStatus::Authorized => {
                self.payment_repo
                    .update_status(payment.id, PaymentStatus::Processing, None)
                    .await?;
            }
            ProviderPaymentStatus::Confirmed => {
                self.payment_repo
                    .update_status(payment.id, PaymentStatus::Completed, None)
                    .await?;
                match payment_type {
                    Some(PaymentType::Booking) => {
                        self.lifecycle
                            .enqueue_confirmed(payment.session_id)
                            .await
                            .map_err(|err| WebhookError::Internal(err.into()))?;
                    }
                    Some(PaymentType::Extension) => {
                        self.lifecycle
                            .apply_confirmed_extension(payment.session_id)
                            .await
                            .map_err(|err| WebhookError::Internal(err.into()))?;
                    }
                    _ => {
                        warn!(
                            payment_id = %payment.id,
                            payment_type = %payment.payment_type,
                            "confirmed payment of unexpected type"
                        );
                    }
                }
            }
            ProviderPaymentStatus::Rejected | ProviderPaymentStatus::Canceled => {
                let status = if webhook.status == ProviderPaymentStatus::Rejected {
                    PaymentStatus::Failed
                } else {
                    PaymentStatus::Cancelled
                };
                self.payment_repo
                    .update_status(payment.id, status, None)
                    .await?;
                match payment_type {
                    Some(PaymentType::Booking) => {
                        self.lifecycle
                            .fail_payment(payment.session_id)
                            .await
                            .map_err(|err| WebhookError::Internal(err.into()))?;
                    }
                    Some(PaymentType::Extension) => {
                        self.lifecycle
                            .drop_requested_extension(payment.session_id)
                            .await
                            .map_err(|err| WebhookError::Internal(err.into()))?;
                    }
                    _ => {}
                }
            }
            ProviderPaymentStatus::Refunded => {
                self.payment_repo
                    .update_status(payment.id, PaymentStatus::Refunded, None)
                    .await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain::entities::sessions::SessionEntity;
    use domain::repositories::boxes::MockBoxRepository;
    use domain::repositories::payment_events::MockPaymentEventRepository;
    use domain::repositories::payment_refunds::MockPaymentRefundRepository;
    use domain::repositories::payments::MockPaymentRepository;
    use domain::repositories::sessions::MockSessionRepository;
    use domain::value_objects::enums::session_statuses::SessionStatus;
    use mockall::predicate::eq;

    use crate::interfaces::hardware::MockHardwareController;
    use crate::interfaces::notifications::MockNotificationSink;
    use crate::interfaces::payment_gateway::MockPaymentGateway;
    use crate::settings::EngineSettings;

    fn payment(payment_type: PaymentType) -> PaymentEntity {
        let now = Utc::now();
        PaymentEntity {
            id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            amount_minor: 3000,
            payment_type: payment_type.to_string(),
            status: PaymentStatus::Pending.to_string(),
            idempotency_key: Uuid::new_v4().to_string(),
            provider_payment_id: Some("pp-1".to_string()),
            payment_url: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn webhook(status: ProviderPaymentStatus) -> PaymentWebhook {
        PaymentWebhook {
            provider_payment_id: "pp-1".to_string(),
            order_id: Uuid::new_v4(),
            status,
            amount_minor: 3000,
        }
    }

    fn queued_session(session_id: Uuid) -> SessionEntity {
        let now = Utc::now();
        SessionEntity {
            id: session_id,
            user_id: Uuid::new_v4(),
            box_id: None,
            box_number: None,
            status: SessionStatus::InQueue.to_string(),
            service_type: "wash".to_string(),
            with_chemistry: false,
            rental_time_minutes: 30,
            extension_time_minutes: 0,
            requested_extension_minutes: 0,
            status_updated_at: now,
            idempotency_key: Uuid::new_v4().to_string(),
            reservation_warning_sent: false,
            completion_warning_sent: false,
            created_at: now,
            updated_at: now,
        }
    }

    struct Fixture {
        payments: MockPaymentRepository,
        events: MockPaymentEventRepository,
        gateway: MockPaymentGateway,
        lifecycle_sessions: MockSessionRepository,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                payments: MockPaymentRepository::new(),
                events: MockPaymentEventRepository::new(),
                gateway: MockPaymentGateway::new(),
                lifecycle_sessions: MockSessionRepository::new(),
            }
        }

        fn into_usecase(self) -> PaymentWebhookUseCase {
            let lifecycle = Arc::new(SessionLifecycleUseCase::new(
                Arc::new(self.lifecycle_sessions),
                Arc::new(MockBoxRepository::new()),
                Arc::new(MockPaymentRepository::new()),
                Arc::new(MockPaymentRefundRepository::new()),
                Arc::new(MockHardwareController::new()),
                Arc::new(MockNotificationSink::new()),
                EngineSettings::default(),
            ));
            PaymentWebhookUseCase::new(
                Arc::new(self.payments),
                Arc::new(self.events),
                lifecycle,
                Arc::new(self.gateway),
            )
        }
    }

    #[tokio::test]
    async fn a_confirmed_booking_webhook_enqueues_the_session() {
        let mut fixture = Fixture::new();
        let booking = payment(PaymentType::Booking);
        let payment_id = booking.id;
        let session_id = booking.session_id;

        fixture
            .gateway
            .expect_verify_webhook()
            .returning(|_, _| Ok(webhook(ProviderPaymentStatus::Confirmed)));
        let resolved = booking.clone();
        fixture
            .payments
            .expect_find_by_provider_payment_id()
            .with(eq("pp-1"))
            .returning(move |_| Ok(Some(resolved.clone())));
        fixture
            .events
            .expect_record_if_new()
            .withf(|event| event.dedup_key == "pp-1:CONFIRMED")
            .times(1)
            .returning(|_| Ok(true));
        fixture
            .payments
            .expect_update_status()
            .with(eq(payment_id), eq(PaymentStatus::Completed), eq(None::<String>))
            .times(1)
            .returning(|_, _, _| Ok(()));
        fixture
            .lifecycle_sessions
            .expect_mark_in_queue()
            .with(eq(session_id))
            .times(1)
            .returning(move |id| Ok(Some(queued_session(id))));

        let outcome = fixture
            .into_usecase()
            .process(b"{}", "signature")
            .await
            .unwrap();

        assert_eq!(
            outcome,
            WebhookOutcome::Applied {
                payment_id,
                status: ProviderPaymentStatus::Confirmed,
            }
        );
    }

    #[tokio::test]
    async fn a_replayed_webhook_applies_nothing_twice() {
        let mut fixture = Fixture::new();
        let booking = payment(PaymentType::Booking);

        fixture
            .gateway
            .expect_verify_webhook()
            .returning(|_, _| Ok(webhook(ProviderPaymentStatus::Confirmed)));
        let resolved = booking.clone();
        fixture
            .payments
            .expect_find_by_provider_payment_id()
            .returning(move |_| Ok(Some(resolved.clone())));
        fixture
            .events
            .expect_record_if_new()
            .times(1)
            .returning(|_| Ok(false));
        // No update_status or lifecycle expectations: the replay must not
        // produce a second transition.

        let outcome = fixture
            .into_usecase()
            .process(b"{}", "signature")
            .await
            .unwrap();

        assert_eq!(outcome, WebhookOutcome::Duplicate);
    }

    #[tokio::test]
    async fn a_rejected_booking_webhook_fails_the_session() {
        let mut fixture = Fixture::new();
        let booking = payment(PaymentType::Booking);
        let payment_id = booking.id;
        let session_id = booking.session_id;

        fixture
            .gateway
            .expect_verify_webhook()
            .returning(|_, _| Ok(webhook(ProviderPaymentStatus::Rejected)));
        let resolved = booking.clone();
        fixture
            .payments
            .expect_find_by_provider_payment_id()
            .returning(move |_| Ok(Some(resolved.clone())));
        fixture
            .events
            .expect_record_if_new()
            .returning(|_| Ok(true));
        fixture
            .payments
            .expect_update_status()
            .with(eq(payment_id), eq(PaymentStatus::Failed), eq(None::<String>))
            .times(1)
            .returning(|_, _, _| Ok(()));
        fixture
            .lifecycle_sessions
            .expect_mark_payment_failed()
            .with(eq(session_id))
            .times(1)
            .returning(move |id| {
                let mut session = queued_session(id);
                session.status = SessionStatus::PaymentFailed.to_string();
                Ok(Some(session))
            });

        fixture
            .into_usecase()
            .process(b"{}", "signature")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn an_unverifiable_webhook_is_rejected_up_front() {
        let mut fixture = Fixture::new();

        fixture
            .gateway
            .expect_verify_webhook()
            .returning(|_, _| Err(anyhow::anyhow!("signature mismatch")));

        let err = fixture
            .into_usecase()
            .process(b"{}", "bad-signature")
            .await
            .unwrap_err();

        assert!(matches!(err, WebhookError::Invalid(_)));
        assert_eq!(err.status_code(), http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn a_confirmed_extension_webhook_applies_the_minutes() {
        let mut fixture = Fixture::new();
        let extension = payment(PaymentType::Extension);
        let session_id = extension.session_id;

        fixture
            .gateway
            .expect_verify_webhook()
            .returning(|_, _| Ok(webhook(ProviderPaymentStatus::Confirmed)));
        let resolved = extension.clone();
        fixture
            .payments
            .expect_find_by_provider_payment_id()
            .returning(move |_| Ok(Some(resolved.clone())));
        fixture
            .events
            .expect_record_if_new()
            .returning(|_| Ok(true));
        fixture
            .payments
            .expect_update_status()
            .returning(|_, _, _| Ok(()));
        fixture
            .lifecycle_sessions
            .expect_apply_requested_extension()
            .with(eq(session_id))
            .times(1)
            .returning(move |id| {
                let mut session = queued_session(id);
                session.status = SessionStatus::Active.to_string();
                session.extension_time_minutes = 15;
                Ok(Some(session))
            });

        fixture
            .into_usecase()
            .process(b"{}", "signature")
            .await
            .unwrap();
    }
}
