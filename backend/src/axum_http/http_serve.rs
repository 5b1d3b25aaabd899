use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Result;
use axum::{Router, http::Method, routing::get};
use chrono::Duration as ChronoDuration;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

use application::{
    interfaces::{
        hardware::HardwareController, notifications::NotificationSink,
        payment_gateway::PaymentGateway,
    },
    settings::{EngineSettings, PricingConfig},
    usecases::{
        bookings::BookingUseCase, payment_webhooks::PaymentWebhookUseCase,
        session_lifecycle::SessionLifecycleUseCase,
    },
};
use domain::repositories::{
    boxes::BoxRepository, payment_events::PaymentEventRepository,
    payment_refunds::PaymentRefundRepository, payments::PaymentRepository,
    sessions::SessionRepository,
};
use infra::{
    db::{
        postgres::postgres_connection::PgPool,
        repositories::{
            boxes::BoxPostgres, payment_events::PaymentEventPostgres,
            payment_refunds::PaymentRefundPostgres, payments::PaymentPostgres,
            sessions::SessionPostgres,
        },
    },
    hardware::controller_client::ControllerClient,
    notifications::bot_api::BotApiNotifier,
    payments::acquiring_client::AcquiringClient,
};

use crate::{
    axum_http::{
        default_routers,
        routers::{payment_webhooks, sessions},
    },
    config::config_model::DotEnvyConfig,
    webhook_processor,
};

pub async fn start(config: Arc<DotEnvyConfig>, db_pool: Arc<PgPool>) -> Result<()> {
    let session_repo = Arc::new(SessionPostgres::new(Arc::clone(&db_pool)));
    let box_repo = Arc::new(BoxPostgres::new(Arc::clone(&db_pool)));
    let payment_repo = Arc::new(PaymentPostgres::new(Arc::clone(&db_pool)));
    let refund_repo = Arc::new(PaymentRefundPostgres::new(Arc::clone(&db_pool)));
    let event_repo = Arc::new(PaymentEventPostgres::new(Arc::clone(&db_pool)));

    let gateway: Arc<dyn PaymentGateway> = Arc::new(AcquiringClient::new(
        config.acquiring.base_url.clone(),
        config.acquiring.terminal_key.clone(),
        config.acquiring.webhook_secret.clone(),
        config.acquiring.success_url.clone(),
        config.acquiring.fail_url.clone(),
    ));
    let hardware: Arc<dyn HardwareController> =
        Arc::new(ControllerClient::new(config.hardware.base_url.clone()));
    let notifier: Arc<dyn NotificationSink> =
        Arc::new(BotApiNotifier::new(config.bot_api.base_url.clone()));

    let settings = EngineSettings {
        reservation_timeout: ChronoDuration::seconds(config.engine.reservation_timeout_secs),
        warning_lead: ChronoDuration::seconds(config.engine.warning_lead_secs),
        box_cooldown: ChronoDuration::seconds(config.engine.box_cooldown_secs),
        refund_max_retries: config.engine.refund_max_retries,
    };
    let pricing = PricingConfig {
        wash_per_minute_minor: config.pricing.wash_per_minute_minor,
        air_dry_per_minute_minor: config.pricing.air_dry_per_minute_minor,
        chemistry_surcharge_minor: config.pricing.chemistry_surcharge_minor,
        max_rental_minutes: config.pricing.max_rental_minutes,
    };

    let lifecycle = Arc::new(SessionLifecycleUseCase::new(
        Arc::clone(&session_repo) as Arc<dyn SessionRepository + Send + Sync>,
        Arc::clone(&box_repo) as Arc<dyn BoxRepository + Send + Sync>,
        Arc::clone(&payment_repo) as Arc<dyn PaymentRepository + Send + Sync>,
        Arc::clone(&refund_repo) as Arc<dyn PaymentRefundRepository + Send + Sync>,
        Arc::clone(&hardware),
        Arc::clone(&notifier),
        settings,
    ));
    let bookings = Arc::new(BookingUseCase::new(
        Arc::clone(&session_repo),
        Arc::clone(&payment_repo),
        Arc::clone(&gateway),
        pricing,
    ));
    let webhook_usecase = Arc::new(PaymentWebhookUseCase::new(
        Arc::clone(&payment_repo) as Arc<dyn PaymentRepository + Send + Sync>,
        Arc::clone(&event_repo) as Arc<dyn PaymentEventRepository + Send + Sync>,
        Arc::clone(&lifecycle),
        Arc::clone(&gateway),
    ));

    let webhook_queue = webhook_processor::spawn_webhook_workers(
        webhook_usecase,
        config.webhook_pool.workers,
        config.webhook_pool.queue_capacity,
    );

    let sessions_state = Arc::new(sessions::SessionsState {
        lifecycle,
        bookings,
        session_repo: session_repo as Arc<dyn SessionRepository + Send + Sync>,
    });

    let app = Router::new()
        .fallback(default_routers::not_found)
        .route("/api/v1/health-check", get(default_routers::health_check))
        .nest("/api/v1/sessions", sessions::routes(sessions_state))
        .nest("/api/v1/payments", payment_webhooks::routes(webhook_queue))
        .layer(TimeoutLayer::new(Duration::from_secs(config.server.timeout)))
        .layer(RequestBodyLimitLayer::new(
            (config.server.body_limit * 1024 * 1024).try_into()?,
        ))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST])
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = TcpListener::bind(addr).await?;

    info!("Server is running on port {}", config.server.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
    };

    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}
