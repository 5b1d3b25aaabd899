use anyhow::Result;
use application::usecases::queue_assigner::QueueAssignerUseCase;
use std::{sync::Arc, time::Duration};
use tracing::info;

pub async fn run_assigner_loop(
    usecase: Arc<QueueAssignerUseCase>,
    interval: Duration,
) -> Result<()> {
    info!("Starting queue assigner loop");
    loop {
        usecase.tick().await;
        tokio::time::sleep(interval).await;
    }
}
