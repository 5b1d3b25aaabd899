pub mod payment_webhooks;
pub mod sessions;
