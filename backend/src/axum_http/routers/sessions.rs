use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use uuid::Uuid;

use application::usecases::{
    bookings::{BookingError, BookingUseCase},
    session_lifecycle::{SessionError, SessionLifecycleUseCase},
};
use domain::{
    repositories::sessions::SessionRepository,
    value_objects::sessions::{CreateBookingModel, RequestExtensionModel, SessionDto},
};
use infra::db::repositories::{payments::PaymentPostgres, sessions::SessionPostgres};
use tracing::error;

pub type Bookings = BookingUseCase<SessionPostgres, PaymentPostgres>;

pub struct SessionsState {
    pub lifecycle: Arc<SessionLifecycleUseCase>,
    pub bookings: Arc<Bookings>,
    pub session_repo: Arc<dyn SessionRepository + Send + Sync>,
}

pub fn routes(state: Arc<SessionsState>) -> Router {
    Router::new()
        .route("/", post(create_booking))
        .route("/current", get(current_session))
        .route("/:session_id/start", post(start_session))
        .route("/:session_id/complete", post(complete_session))
        .route("/:session_id/cancel", post(cancel_session))
        .route("/:session_id/extend", post(request_extension))
        .with_state(state)
}

async fn create_booking(
    State(state): State<Arc<SessionsState>>,
    Json(payload): Json<CreateBookingModel>,
) -> Response {
    match state.bookings.create_booking(payload).await {
        Ok(confirmation) => (StatusCode::CREATED, Json(confirmation)).into_response(),
        Err(err) => map_booking_error("create_booking", err),
    }
}

#[derive(Debug, Deserialize)]
struct CurrentSessionQuery {
    user_id: Uuid,
}

async fn current_session(
    State(state): State<Arc<SessionsState>>,
    Query(query): Query<CurrentSessionQuery>,
) -> Response {
    match state.session_repo.find_active_by_user(query.user_id).await {
        Ok(Some(session)) => (StatusCode::OK, Json(SessionDto::from(session))).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "no open session").into_response(),
        Err(err) => {
            error!(user_id = %query.user_id, error = ?err, "current session lookup failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn start_session(
    State(state): State<Arc<SessionsState>>,
    Path(session_id): Path<Uuid>,
) -> Response {
    match state.lifecycle.start(session_id).await {
        Ok(session) => (StatusCode::OK, Json(SessionDto::from(session))).into_response(),
        Err(err) => map_session_error("start_session", err),
    }
}

async fn complete_session(
    State(state): State<Arc<SessionsState>>,
    Path(session_id): Path<Uuid>,
) -> Response {
    match state.lifecycle.complete(session_id, false).await {
        Ok(session) => (StatusCode::OK, Json(SessionDto::from(session))).into_response(),
        Err(err) => map_session_error("complete_session", err),
    }
}

async fn cancel_session(
    State(state): State<Arc<SessionsState>>,
    Path(session_id): Path<Uuid>,
) -> Response {
    match state.lifecycle.cancel(session_id).await {
        Ok(session) => (StatusCode::OK, Json(SessionDto::from(session))).into_response(),
        Err(err) => map_session_error("cancel_session", err),
    }
}

async fn request_extension(
    State(state): State<Arc<SessionsState>>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<RequestExtensionModel>,
) -> Response {
    match state.bookings.request_extension(session_id, payload).await {
        Ok(confirmation) => (StatusCode::CREATED, Json(confirmation)).into_response(),
        Err(err) => map_booking_error("request_extension", err),
    }
}

fn map_session_error(label: &str, err: SessionError) -> Response {
    let status = err.status_code();
    if status.is_server_error() {
        error!("{label} failed: {err}");
    }
    (status, err.to_string()).into_response()
}

fn map_booking_error(label: &str, err: BookingError) -> Response {
    let status = err.status_code();
    if status.is_server_error() {
        error!("{label} failed: {err}");
    }
    (status, err.to_string()).into_response()
}
