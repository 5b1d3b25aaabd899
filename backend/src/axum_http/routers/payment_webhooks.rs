use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use tokio::sync::mpsc;
use tracing::warn;

use crate::webhook_processor::WebhookJob;

const SIGNATURE_HEADER: &str = "x-acquiring-signature";

pub fn routes(queue: mpsc::Sender<WebhookJob>) -> Router {
    Router::new()
        .route("/webhook", post(receive_webhook))
        .with_state(queue)
}

/// Intake only: enqueue and return. A full queue is rejected synchronously so
/// the provider's redelivery mechanism carries the retry.
async fn receive_webhook(
    State(queue): State<mpsc::Sender<WebhookJob>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(signature) = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
    else {
        return (StatusCode::BAD_REQUEST, "missing signature header").into_response();
    };

    let job = WebhookJob {
        payload: body.to_vec(),
        signature,
    };

    match queue.try_send(job) {
        Ok(()) => (StatusCode::OK, "OK").into_response(),
        Err(mpsc::error::TrySendError::Full(_)) => {
            warn!("webhook queue full; asking the provider to redeliver");
            (StatusCode::SERVICE_UNAVAILABLE, "queue full").into_response()
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            warn!("webhook queue closed");
            (StatusCode::SERVICE_UNAVAILABLE, "queue closed").into_response()
        }
    }
}
