use anyhow::Result;
use application::usecases::refund_retry::RefundRetryUseCase;
use chrono::Utc;
use std::{sync::Arc, time::Duration};
use tracing::info;

pub async fn run_refund_retry_loop(
    usecase: Arc<RefundRetryUseCase>,
    interval: Duration,
) -> Result<()> {
    info!("Starting refund retry loop");
    loop {
        usecase.tick(Utc::now()).await;
        tokio::time::sleep(interval).await;
    }
}
