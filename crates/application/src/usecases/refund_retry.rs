use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{error, info, warn};

use domain::{
    entities::payment_refunds::PaymentRefundEntity,
    repositories::{payment_refunds::PaymentRefundRepository, payments::PaymentRepository},
    value_objects::enums::payment_statuses::PaymentStatus,
};

use crate::interfaces::payment_gateway::{GatewayError, PaymentGateway};

const BASE_DELAY_SECS: i64 = 30;
const MAX_DELAY_SECS: i64 = 24 * 60 * 60;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RefundSweepStats {
    pub completed: usize,
    pub rescheduled: usize,
    pub failed: usize,
}

/// Periodic retry of pending refunds with exponential backoff. A refund that
/// exhausts its budget goes terminal and is surfaced for manual handling;
/// it is never retried automatically again.
pub struct RefundRetryUseCase {
    refund_repo: Arc<dyn PaymentRefundRepository + Send + Sync>,
    payment_repo: Arc<dyn PaymentRepository + Send + Sync>,
    gateway: Arc<dyn PaymentGateway>,
}

impl RefundRetryUseCase {
    pub fn new(
        refund_repo: Arc<dyn PaymentRefundRepository + Send + Sync>,
        payment_repo: Arc<dyn PaymentRepository + Send + Sync>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            refund_repo,
            payment_repo,
            gateway,
        }
    }

    pub async fn tick(&self, now: DateTime<Utc>) -> RefundSweepStats {
        let mut stats = RefundSweepStats::default();

        let due = match self.refund_repo.list_due(now).await {
            Ok(due) => due,
            Err(err) => {
                error!(error = ?err, "failed to list due refunds");
                return stats;
            }
        };

        for refund in due {
            match self.attempt(&refund, now).await {
                Ok(outcome) => match outcome {
                    AttemptOutcome::Completed => stats.completed += 1,
                    AttemptOutcome::Rescheduled => stats.rescheduled += 1,
                    AttemptOutcome::Failed => stats.failed += 1,
                },
                Err(err) => {
                    error!(refund_id = %refund.id, error = ?err, "refund attempt errored");
                }
            }
        }

        if stats != RefundSweepStats::default() {
            info!(
                completed = stats.completed,
                rescheduled = stats.rescheduled,
                failed = stats.failed,
                "refund sweep finished"
            );
        }
        stats
    }

    async fn attempt(
        &self,
        refund: &PaymentRefundEntity,
        now: DateTime<Utc>,
    ) -> anyhow::Result<AttemptOutcome> {
        let payment = match self.payment_repo.find_by_id(refund.payment_id).await? {
            Some(payment) => payment,
            None => {
                self.refund_repo
                    .mark_failed(refund.id, "payment row is missing")
                    .await?;
                return Ok(AttemptOutcome::Failed);
            }
        };
        let Some(provider_payment_id) = payment.provider_payment_id.as_deref() else {
            self.refund_repo
                .mark_failed(refund.id, "payment has no provider reference")
                .await?;
            return Ok(AttemptOutcome::Failed);
        };

        match self
            .gateway
            .refund_payment(provider_payment_id, refund.amount_minor)
            .await
        {
            Ok(provider_refund_id) => {
                self.refund_repo
                    .mark_completed(refund.id, &provider_refund_id)
                    .await?;
                if refund.amount_minor >= payment.amount_minor {
                    self.payment_repo
                        .update_status(payment.id, PaymentStatus::Refunded, None)
                        .await?;
                }
                info!(
                    refund_id = %refund.id,
                    payment_id = %payment.id,
                    amount_minor = refund.amount_minor,
                    "refund completed"
                );
                Ok(AttemptOutcome::Completed)
            }
            Err(GatewayError::Unavailable(message)) => {
                let attempts = refund.retry_count + 1;
                if attempts >= refund.max_retries {
                    error!(
                        refund_id = %refund.id,
                        payment_id = %payment.id,
                        attempts,
                        error = %message,
                        "refund exhausted its retries; manual handling required"
                    );
                    self.refund_repo.mark_failed(refund.id, &message).await?;
                    return Ok(AttemptOutcome::Failed);
                }
                let next_retry_at = now + retry_delay(refund.retry_count);
                warn!(
                    refund_id = %refund.id,
                    attempts,
                    next_retry_at = %next_retry_at,
                    error = %message,
                    "refund attempt failed; rescheduled"
                );
                self.refund_repo
                    .schedule_retry(refund.id, next_retry_at, &message)
                    .await?;
                Ok(AttemptOutcome::Rescheduled)
            }
            Err(GatewayError::Rejected(message)) => {
                error!(
                    refund_id = %refund.id,
                    payment_id = %payment.id,
                    error = %message,
                    "provider permanently rejected the refund"
                );
                self.refund_repo.mark_failed(refund.id, &message).await?;
                Ok(AttemptOutcome::Failed)
            }
        }
    }
}

enum AttemptOutcome {
    Completed,
    Rescheduled,
    Failed,
}

/// `min(30s * 2^retry_count, 24h)`.
fn retry_delay(retry_count: i32) -> Duration {
    let exponent = retry_count.clamp(0, 31) as u32;
    let secs = BASE_DELAY_SECS
        .checked_shl(exponent)
        .unwrap_or(MAX_DELAY_SECS)
        .min(MAX_DELAY_SECS);
    Duration::seconds(secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::entities::payments::PaymentEntity;
    use domain::repositories::payment_refunds::MockPaymentRefundRepository;
    use domain::repositories::payments::MockPaymentRepository;
    use domain::value_objects::enums::refund_statuses::RefundStatus;
    use mockall::predicate::eq;
    use uuid::Uuid;

    use crate::interfaces::payment_gateway::MockPaymentGateway;

    fn refund(retry_count: i32, amount_minor: i32) -> PaymentRefundEntity {
        let now = Utc::now();
        PaymentRefundEntity {
            id: Uuid::new_v4(),
            payment_id: Uuid::new_v4(),
            amount_minor,
            status: RefundStatus::Pending.to_string(),
            retry_count,
            max_retries: 5,
            next_retry_at: now,
            idempotency_key: Uuid::new_v4().to_string(),
            provider_refund_id: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn payment(payment_id: Uuid, amount_minor: i32) -> PaymentEntity {
        let now = Utc::now();
        PaymentEntity {
            id: payment_id,
            session_id: Uuid::new_v4(),
            amount_minor,
            payment_type: "booking".to_string(),
            status: PaymentStatus::Completed.to_string(),
            idempotency_key: Uuid::new_v4().to_string(),
            provider_payment_id: Some("pp-9".to_string()),
            payment_url: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn usecase(
        refunds: MockPaymentRefundRepository,
        payments: MockPaymentRepository,
        gateway: MockPaymentGateway,
    ) -> RefundRetryUseCase {
        RefundRetryUseCase::new(Arc::new(refunds), Arc::new(payments), Arc::new(gateway))
    }

    #[test]
    fn backoff_doubles_from_thirty_seconds_and_caps_at_a_day() {
        assert_eq!(retry_delay(0), Duration::seconds(30));
        assert_eq!(retry_delay(1), Duration::seconds(60));
        assert_eq!(retry_delay(2), Duration::seconds(120));
        assert_eq!(retry_delay(3), Duration::seconds(240));
        assert_eq!(retry_delay(12), Duration::hours(24));
        assert_eq!(retry_delay(31), Duration::hours(24));
    }

    #[tokio::test]
    async fn a_transient_failure_reschedules_with_a_growing_delay() {
        let mut refunds = MockPaymentRefundRepository::new();
        let mut payments = MockPaymentRepository::new();
        let mut gateway = MockPaymentGateway::new();

        let due = refund(1, 1500);
        let refund_id = due.id;
        let booking = payment(due.payment_id, 3000);
        let now = Utc::now();

        let listed = vec![due.clone()];
        refunds.expect_list_due().returning(move |_| Ok(listed.clone()));
        payments
            .expect_find_by_id()
            .returning(move |_| Ok(Some(booking.clone())));
        gateway
            .expect_refund_payment()
            .times(1)
            .returning(|_, _| Err(GatewayError::Unavailable("connect timeout".to_string())));
        refunds
            .expect_schedule_retry()
            .with(eq(refund_id), eq(now + Duration::seconds(60)), eq("connect timeout"))
            .times(1)
            .returning(|_, _, _| Ok(()));

        let stats = usecase(refunds, payments, gateway).tick(now).await;

        assert_eq!(stats.rescheduled, 1);
    }

    #[tokio::test]
    async fn the_final_transient_failure_goes_terminal() {
        let mut refunds = MockPaymentRefundRepository::new();
        let mut payments = MockPaymentRepository::new();
        let mut gateway = MockPaymentGateway::new();

        let due = refund(4, 1500); // attempt 5 of 5
        let refund_id = due.id;
        let booking = payment(due.payment_id, 3000);

        let listed = vec![due.clone()];
        refunds.expect_list_due().returning(move |_| Ok(listed.clone()));
        payments
            .expect_find_by_id()
            .returning(move |_| Ok(Some(booking.clone())));
        gateway
            .expect_refund_payment()
            .returning(|_, _| Err(GatewayError::Unavailable("still down".to_string())));
        refunds
            .expect_mark_failed()
            .with(eq(refund_id), eq("still down"))
            .times(1)
            .returning(|_, _| Ok(()));

        let stats = usecase(refunds, payments, gateway).tick(Utc::now()).await;

        assert_eq!(stats.failed, 1);
    }

    #[tokio::test]
    async fn a_permanent_rejection_never_reschedules() {
        let mut refunds = MockPaymentRefundRepository::new();
        let mut payments = MockPaymentRepository::new();
        let mut gateway = MockPaymentGateway::new();

        let due = refund(0, 1500);
        let refund_id = due.id;
        let booking = payment(due.payment_id, 3000);

        let listed = vec![due.clone()];
        refunds.expect_list_due().returning(move |_| Ok(listed.clone()));
        payments
            .expect_find_by_id()
            .returning(move |_| Ok(Some(booking.clone())));
        gateway
            .expect_refund_payment()
            .returning(|_, _| Err(GatewayError::Rejected("already refunded".to_string())));
        refunds
            .expect_mark_failed()
            .with(eq(refund_id), eq("already refunded"))
            .times(1)
            .returning(|_, _| Ok(()));
        // No schedule_retry expectation: terminal rejections skip backoff.

        let stats = usecase(refunds, payments, gateway).tick(Utc::now()).await;

        assert_eq!(stats.failed, 1);
    }

    #[tokio::test]
    async fn a_full_refund_marks_the_payment_refunded() {
        let mut refunds = MockPaymentRefundRepository::new();
        let mut payments = MockPaymentRepository::new();
        let mut gateway = MockPaymentGateway::new();

        let due = refund(0, 3000);
        let refund_id = due.id;
        let payment_id = due.payment_id;
        let booking = payment(payment_id, 3000);

        let listed = vec![due.clone()];
        refunds.expect_list_due().returning(move |_| Ok(listed.clone()));
        payments
            .expect_find_by_id()
            .returning(move |_| Ok(Some(booking.clone())));
        gateway
            .expect_refund_payment()
            .with(eq("pp-9"), eq(3000))
            .times(1)
            .returning(|_, _| Ok("rf-1".to_string()));
        refunds
            .expect_mark_completed()
            .with(eq(refund_id), eq("rf-1"))
            .times(1)
            .returning(|_, _| Ok(()));
        payments
            .expect_update_status()
            .with(eq(payment_id), eq(PaymentStatus::Refunded), eq(None::<String>))
            .times(1)
            .returning(|_, _, _| Ok(()));

        let stats = usecase(refunds, payments, gateway).tick(Utc::now()).await;

        assert_eq!(stats.completed, 1);
    }

    #[tokio::test]
    async fn a_partial_refund_leaves_the_payment_completed() {
        let mut refunds = MockPaymentRefundRepository::new();
        let mut payments = MockPaymentRepository::new();
        let mut gateway = MockPaymentGateway::new();

        let due = refund(0, 1000);
        let booking = payment(due.payment_id, 3000);

        let listed = vec![due.clone()];
        refunds.expect_list_due().returning(move |_| Ok(listed.clone()));
        payments
            .expect_find_by_id()
            .returning(move |_| Ok(Some(booking.clone())));
        gateway
            .expect_refund_payment()
            .returning(|_, _| Ok("rf-2".to_string()));
        refunds
            .expect_mark_completed()
            .returning(|_, _| Ok(()));
        // No update_status expectation: a partial refund leaves the original
        // payment completed.

        let stats = usecase(refunds, payments, gateway).tick(Utc::now()).await;

        assert_eq!(stats.completed, 1);
    }
}
