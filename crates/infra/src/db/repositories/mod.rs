pub mod boxes;
pub mod payment_events;
pub mod payment_refunds;
pub mod payments;
pub mod sessions;
