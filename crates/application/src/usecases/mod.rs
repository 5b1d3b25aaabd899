pub mod bookings;
pub mod payment_webhooks;
pub mod queue_assigner;
pub mod refund_retry;
pub mod session_lifecycle;
pub mod timeout_supervisor;
