use anyhow::Result;
use application::usecases::timeout_supervisor::TimeoutSupervisorUseCase;
use chrono::Utc;
use std::{sync::Arc, time::Duration};
use tracing::info;

pub async fn run_notification_loop(
    usecase: Arc<TimeoutSupervisorUseCase>,
    interval: Duration,
) -> Result<()> {
    info!("Starting deadline notification loop");
    loop {
        usecase.send_deadline_warnings(Utc::now()).await;
        tokio::time::sleep(interval).await;
    }
}
