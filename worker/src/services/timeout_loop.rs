use anyhow::Result;
use application::usecases::timeout_supervisor::TimeoutSupervisorUseCase;
use chrono::Utc;
use std::{sync::Arc, time::Duration};
use tracing::info;

pub async fn run_reservation_expiry_loop(
    usecase: Arc<TimeoutSupervisorUseCase>,
    interval: Duration,
) -> Result<()> {
    info!("Starting reservation expiry loop");
    loop {
        usecase.expire_stale_reservations(Utc::now()).await;
        tokio::time::sleep(interval).await;
    }
}

pub async fn run_auto_complete_loop(
    usecase: Arc<TimeoutSupervisorUseCase>,
    interval: Duration,
) -> Result<()> {
    info!("Starting auto-complete loop");
    loop {
        usecase.auto_complete_elapsed(Utc::now()).await;
        tokio::time::sleep(interval).await;
    }
}
