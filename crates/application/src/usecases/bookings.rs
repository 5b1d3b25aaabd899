use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use domain::{
    entities::{payments::InsertPaymentEntity, sessions::InsertSessionEntity},
    repositories::{payments::PaymentRepository, sessions::SessionRepository},
    value_objects::{
        enums::{
            payment_statuses::PaymentStatus, payment_types::PaymentType,
            service_types::ServiceType, session_statuses::SessionStatus,
        },
        sessions::{BookingConfirmationDto, CreateBookingModel, RequestExtensionModel},
    },
};

use crate::interfaces::payment_gateway::{GatewayError, PaymentGateway};
use crate::settings::PricingConfig;

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("session not found")]
    SessionNotFound,
    #[error("{0}")]
    Validation(String),
    #[error("payment provider error: {0}")]
    Provider(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl BookingError {
    pub fn status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            BookingError::SessionNotFound => StatusCode::NOT_FOUND,
            BookingError::Validation(_) => StatusCode::BAD_REQUEST,
            BookingError::Provider(_) => StatusCode::BAD_GATEWAY,
            BookingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<GatewayError> for BookingError {
    fn from(err: GatewayError) -> Self {
        BookingError::Provider(err.to_string())
    }
}

pub type BookingResult<T> = std::result::Result<T, BookingError>;

/// Booking and paid-extension intake. Both entry points are idempotent:
/// the caller's key resolves to the same session/payment pair on every
/// retry, and the provider is charged at most once per key.
pub struct BookingUseCase<S, P>
where
    S: SessionRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
{
    session_repo: Arc<S>,
    payment_repo: Arc<P>,
    gateway: Arc<dyn PaymentGateway>,
    pricing: PricingConfig,
}

impl<S, P> BookingUseCase<S, P>
where
    S: SessionRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
{
    pub fn new(
        session_repo: Arc<S>,
        payment_repo: Arc<P>,
        gateway: Arc<dyn PaymentGateway>,
        pricing: PricingConfig,
    ) -> Self {
        Self {
            session_repo,
            payment_repo,
            gateway,
            pricing,
        }
    }

    pub async fn create_booking(
        &self,
        model: CreateBookingModel,
    ) -> BookingResult<BookingConfirmationDto> {
        self.validate_minutes(model.rental_time_minutes)?;
        if model.idempotency_key.trim().is_empty() {
            return Err(BookingError::Validation(
                "idempotency key is required".to_string(),
            ));
        }

        let session = match self
            .session_repo
            .find_by_idempotency_key(&model.idempotency_key)
            .await?
        {
            Some(existing) => {
                info!(
                    session_id = %existing.id,
                    idempotency_key = %model.idempotency_key,
                    "booking replay resolved to existing session"
                );
                existing
            }
            None => {
                if let Some(active) = self
                    .session_repo
                    .find_active_by_user(model.user_id)
                    .await?
                {
                    warn!(
                        user_id = %model.user_id,
                        session_id = %active.id,
                        "booking rejected: user already has an open session"
                    );
                    return Err(BookingError::Validation(
                        "user already has an open session".to_string(),
                    ));
                }

                self.session_repo
                    .create(InsertSessionEntity {
                        user_id: model.user_id,
                        status: SessionStatus::Created.to_string(),
                        service_type: model.service_type.to_string(),
                        with_chemistry: model.with_chemistry,
                        rental_time_minutes: model.rental_time_minutes,
                        extension_time_minutes: 0,
                        requested_extension_minutes: 0,
                        status_updated_at: Utc::now(),
                        idempotency_key: model.idempotency_key.clone(),
                        reservation_warning_sent: false,
                        completion_warning_sent: false,
                    })
                    .await?
            }
        };

        let amount_minor = self.pricing.booking_amount_minor(
            model.service_type,
            model.rental_time_minutes,
            model.with_chemistry,
        );

        let payment = self
            .payment_repo
            .create_if_absent(InsertPaymentEntity {
                session_id: session.id,
                amount_minor,
                payment_type: PaymentType::Booking.to_string(),
                status: PaymentStatus::Pending.to_string(),
                idempotency_key: format!("booking:{}", model.idempotency_key),
                provider_payment_id: None,
                payment_url: None,
                error: None,
            })
            .await?;

        // A replayed request whose provider call already happened returns the
        // stored URL; the provider sees one Init per key, ever.
        if let Some(url) = payment.payment_url.clone() {
            return Ok(BookingConfirmationDto {
                session_id: session.id,
                payment_id: payment.id,
                amount_minor: payment.amount_minor,
                payment_url: Some(url),
            });
        }

        let description = format!(
            "{} box, {} min",
            model.service_type, model.rental_time_minutes
        );
        let init = self
            .gateway
            .init_payment(payment.id, payment.amount_minor, &description)
            .await?;
        self.payment_repo
            .set_provider_refs(payment.id, &init.provider_payment_id, &init.payment_url)
            .await?;

        info!(
            session_id = %session.id,
            payment_id = %payment.id,
            amount_minor = payment.amount_minor,
            "booking payment initialized"
        );

        Ok(BookingConfirmationDto {
            session_id: session.id,
            payment_id: payment.id,
            amount_minor: payment.amount_minor,
            payment_url: Some(init.payment_url),
        })
    }

    /// Registers a paid extension for an `active` session. The minutes are
    /// held in `requested_extension_minutes` until the payment confirms.
    pub async fn request_extension(
        &self,
        session_id: Uuid,
        model: RequestExtensionModel,
    ) -> BookingResult<BookingConfirmationDto> {
        self.validate_minutes(model.minutes)?;

        let session = self
            .session_repo
            .set_requested_extension(session_id, model.minutes)
            .await?
            .ok_or_else(|| {
                BookingError::Validation("session is not active".to_string())
            })?;

        let service_type = ServiceType::from_str(&session.service_type)
            .ok_or_else(|| anyhow::anyhow!("unknown service type {}", session.service_type))?;
        let amount_minor = self
            .pricing
            .extension_amount_minor(service_type, model.minutes);

        let payment = self
            .payment_repo
            .create_if_absent(InsertPaymentEntity {
                session_id: session.id,
                amount_minor,
                payment_type: PaymentType::Extension.to_string(),
                status: PaymentStatus::Pending.to_string(),
                idempotency_key: format!("extension:{}", model.idempotency_key),
                provider_payment_id: None,
                payment_url: None,
                error: None,
            })
            .await?;

        if let Some(url) = payment.payment_url.clone() {
            return Ok(BookingConfirmationDto {
                session_id: session.id,
                payment_id: payment.id,
                amount_minor: payment.amount_minor,
                payment_url: Some(url),
            });
        }

        let description = format!("extension, {} min", model.minutes);
        let init = self
            .gateway
            .init_payment(payment.id, payment.amount_minor, &description)
            .await?;
        self.payment_repo
            .set_provider_refs(payment.id, &init.provider_payment_id, &init.payment_url)
            .await?;

        info!(
            session_id = %session.id,
            payment_id = %payment.id,
            minutes = model.minutes,
            "extension payment initialized"
        );

        Ok(BookingConfirmationDto {
            session_id: session.id,
            payment_id: payment.id,
            amount_minor: payment.amount_minor,
            payment_url: Some(init.payment_url),
        })
    }

    fn validate_minutes(&self, minutes: i32) -> BookingResult<()> {
        if minutes <= 0 {
            return Err(BookingError::Validation(
                "rental time must be positive".to_string(),
            ));
        }
        if minutes > self.pricing.max_rental_minutes {
            return Err(BookingError::Validation(format!(
                "rental time exceeds the {}-minute maximum",
                self.pricing.max_rental_minutes
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::entities::payments::PaymentEntity;
    use domain::entities::sessions::SessionEntity;
    use domain::repositories::payments::MockPaymentRepository;
    use domain::repositories::sessions::MockSessionRepository;
    use mockall::predicate::eq;

    use crate::interfaces::payment_gateway::{InitPaymentResponse, MockPaymentGateway};

    fn pricing() -> PricingConfig {
        PricingConfig {
            wash_per_minute_minor: 100,
            air_dry_per_minute_minor: 50,
            chemistry_surcharge_minor: 500,
            max_rental_minutes: 120,
        }
    }

    fn booking_model(key: &str) -> CreateBookingModel {
        CreateBookingModel {
            user_id: Uuid::new_v4(),
            service_type: ServiceType::Wash,
            with_chemistry: false,
            rental_time_minutes: 30,
            idempotency_key: key.to_string(),
        }
    }

    fn created_session(user_id: Uuid, idempotency_key: &str) -> SessionEntity {
        let now = Utc::now();
        SessionEntity {
            id: Uuid::new_v4(),
            user_id,
            box_id: None,
            box_number: None,
            status: SessionStatus::Created.to_string(),
            service_type: "wash".to_string(),
            with_chemistry: false,
            rental_time_minutes: 30,
            extension_time_minutes: 0,
            requested_extension_minutes: 0,
            status_updated_at: now,
            idempotency_key: idempotency_key.to_string(),
            reservation_warning_sent: false,
            completion_warning_sent: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn pending_payment(
        session_id: Uuid,
        idempotency_key: &str,
        payment_url: Option<&str>,
    ) -> PaymentEntity {
        let now = Utc::now();
        PaymentEntity {
            id: Uuid::new_v4(),
            session_id,
            amount_minor: 3000,
            payment_type: PaymentType::Booking.to_string(),
            status: PaymentStatus::Pending.to_string(),
            idempotency_key: idempotency_key.to_string(),
            provider_payment_id: payment_url.map(|_| "pp-77".to_string()),
            payment_url: payment_url.map(|url| url.to_string()),
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn replaying_a_booking_charges_the_provider_exactly_once() {
        let mut sessions = MockSessionRepository::new();
        let mut payments = MockPaymentRepository::new();
        let mut gateway = MockPaymentGateway::new();

        let model = booking_model("book-1");
        let user_id = model.user_id;
        let session = created_session(user_id, "book-1");
        let session_id = session.id;
        let fresh_payment = pending_payment(session_id, "booking:book-1", None);
        let payment_id = fresh_payment.id;
        let mut stored_payment = fresh_payment.clone();
        stored_payment.provider_payment_id = Some("pp-77".to_string());
        stored_payment.payment_url = Some("https://pay.example/77".to_string());

        // First request: no session yet.
        sessions
            .expect_find_by_idempotency_key()
            .with(eq("book-1"))
            .times(1)
            .returning(|_| Ok(None));
        sessions
            .expect_find_active_by_user()
            .times(1)
            .returning(|_| Ok(None));
        let created = session.clone();
        sessions
            .expect_create()
            .times(1)
            .returning(move |_| Ok(created.clone()));
        // Second request: the same key resolves to the stored session.
        let replayed = session.clone();
        sessions
            .expect_find_by_idempotency_key()
            .with(eq("book-1"))
            .times(1)
            .returning(move |_| Ok(Some(replayed.clone())));

        payments
            .expect_create_if_absent()
            .times(1)
            .returning(move |_| Ok(fresh_payment.clone()));
        payments
            .expect_create_if_absent()
            .times(1)
            .returning(move |_| Ok(stored_payment.clone()));

        gateway
            .expect_init_payment()
            .with(eq(payment_id), eq(3000), mockall::predicate::always())
            .times(1)
            .returning(|_, _, _| {
                Ok(InitPaymentResponse {
                    provider_payment_id: "pp-77".to_string(),
                    payment_url: "https://pay.example/77".to_string(),
                })
            });
        payments
            .expect_set_provider_refs()
            .times(1)
            .returning(|_, _, _| Ok(()));

        let usecase = BookingUseCase::new(
            Arc::new(sessions),
            Arc::new(payments),
            Arc::new(gateway),
            pricing(),
        );

        let first = usecase.create_booking(model.clone()).await.unwrap();
        let second = usecase.create_booking(model).await.unwrap();

        assert_eq!(first.payment_id, second.payment_id);
        assert_eq!(first.session_id, second.session_id);
        assert_eq!(
            second.payment_url.as_deref(),
            Some("https://pay.example/77")
        );
    }

    #[tokio::test]
    async fn a_second_open_session_per_user_is_rejected() {
        let mut sessions = MockSessionRepository::new();
        let payments = MockPaymentRepository::new();
        let gateway = MockPaymentGateway::new();

        let model = booking_model("book-2");
        let open_session = created_session(model.user_id, "other-key");

        sessions
            .expect_find_by_idempotency_key()
            .returning(|_| Ok(None));
        sessions
            .expect_find_active_by_user()
            .returning(move |_| Ok(Some(open_session.clone())));

        let usecase = BookingUseCase::new(
            Arc::new(sessions),
            Arc::new(payments),
            Arc::new(gateway),
            pricing(),
        );

        let err = usecase.create_booking(model).await.unwrap_err();
        assert!(matches!(err, BookingError::Validation(_)));
        assert_eq!(err.status_code(), http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn chemistry_bookings_carry_the_surcharge() {
        let mut sessions = MockSessionRepository::new();
        let mut payments = MockPaymentRepository::new();
        let mut gateway = MockPaymentGateway::new();

        let mut model = booking_model("book-3");
        model.with_chemistry = true;
        let session = created_session(model.user_id, "book-3");
        let session_id = session.id;

        sessions
            .expect_find_by_idempotency_key()
            .returning(|_| Ok(None));
        sessions
            .expect_find_active_by_user()
            .returning(|_| Ok(None));
        sessions
            .expect_create()
            .returning(move |_| Ok(session.clone()));

        payments
            .expect_create_if_absent()
            .withf(|payment| {
                // 30 min * 100 + 500 chemistry surcharge
                payment.amount_minor == 3500
            })
            .times(1)
            .returning(move |insert| {
                let mut payment = pending_payment(session_id, "booking:book-3", None);
                payment.amount_minor = insert.amount_minor;
                Ok(payment)
            });
        gateway
            .expect_init_payment()
            .returning(|_, _, _| {
                Ok(InitPaymentResponse {
                    provider_payment_id: "pp-88".to_string(),
                    payment_url: "https://pay.example/88".to_string(),
                })
            });
        payments
            .expect_set_provider_refs()
            .returning(|_, _, _| Ok(()));

        let usecase = BookingUseCase::new(
            Arc::new(sessions),
            Arc::new(payments),
            Arc::new(gateway),
            pricing(),
        );

        let confirmation = usecase.create_booking(model).await.unwrap();
        assert_eq!(confirmation.amount_minor, 3500);
    }

    #[tokio::test]
    async fn extension_requires_an_active_session() {
        let mut sessions = MockSessionRepository::new();
        let payments = MockPaymentRepository::new();
        let gateway = MockPaymentGateway::new();

        sessions
            .expect_set_requested_extension()
            .returning(|_, _| Ok(None));

        let usecase = BookingUseCase::new(
            Arc::new(sessions),
            Arc::new(payments),
            Arc::new(gateway),
            pricing(),
        );

        let err = usecase
            .request_extension(
                Uuid::new_v4(),
                RequestExtensionModel {
                    minutes: 15,
                    idempotency_key: "ext-1".to_string(),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, BookingError::Validation(_)));
    }
}
