pub mod box_statuses;
pub mod payment_statuses;
pub mod payment_types;
pub mod refund_statuses;
pub mod service_types;
pub mod session_statuses;
