use std::sync::Arc;
use std::time::{Duration, Instant};

use application::usecases::payment_webhooks::PaymentWebhookUseCase;
use tokio::sync::{Mutex, mpsc};
use tracing::{error, info, warn};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug)]
pub struct WebhookJob {
    pub payload: Vec<u8>,
    pub signature: String,
}

/// Spawns the fixed-size worker pool draining the webhook queue. The queue is
/// bounded on purpose: when it fills, the HTTP intake rejects synchronously
/// and the provider's own redelivery becomes the retry mechanism.
pub fn spawn_webhook_workers(
    usecase: Arc<PaymentWebhookUseCase>,
    workers: usize,
    queue_capacity: usize,
) -> mpsc::Sender<WebhookJob> {
    let (tx, rx) = mpsc::channel::<WebhookJob>(queue_capacity);
    let rx = Arc::new(Mutex::new(rx));

    for worker_id in 0..workers {
        let rx = Arc::clone(&rx);
        let usecase = Arc::clone(&usecase);
        tokio::spawn(async move {
            run_worker(worker_id, rx, usecase).await;
        });
    }

    info!(workers, queue_capacity, "webhook worker pool started");
    tx
}

async fn run_worker(
    worker_id: usize,
    rx: Arc<Mutex<mpsc::Receiver<WebhookJob>>>,
    usecase: Arc<PaymentWebhookUseCase>,
) {
    loop {
        let job = { rx.lock().await.recv().await };
        let Some(job) = job else {
            info!(worker_id, "webhook queue closed; worker stopping");
            return;
        };

        let started = Instant::now();
        let result = tokio::time::timeout(
            WEBHOOK_TIMEOUT,
            usecase.process(&job.payload, &job.signature),
        )
        .await;
        let duration_ms = started.elapsed().as_millis();

        match result {
            Ok(Ok(outcome)) => {
                info!(worker_id, duration_ms, outcome = ?outcome, "webhook processed");
            }
            Ok(Err(err)) => {
                // Not requeued locally: provider redelivery plus the dedup
                // key converge on the correct state.
                warn!(
                    worker_id,
                    duration_ms,
                    error = %err,
                    "webhook processing failed"
                );
            }
            Err(_) => {
                error!(worker_id, duration_ms, "webhook processing timed out");
            }
        }
    }
}
