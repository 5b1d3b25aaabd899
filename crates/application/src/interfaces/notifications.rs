use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use domain::value_objects::notifications::NotificationKind;

/// Best-effort messaging. Errors are logged by callers and never retried.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, user_id: Uuid, kind: NotificationKind) -> Result<()>;
}
