pub mod assigner_loop;
pub mod notification_loop;
pub mod refund_retry_loop;
pub mod timeout_loop;
