use anyhow::Result;
use chrono::Duration as ChronoDuration;
use std::{sync::Arc, time::Duration};
use tracing::{error, info};

use application::{
    interfaces::{
        hardware::HardwareController, notifications::NotificationSink,
        payment_gateway::PaymentGateway,
    },
    settings::EngineSettings,
    usecases::{
        queue_assigner::QueueAssignerUseCase, refund_retry::RefundRetryUseCase,
        session_lifecycle::SessionLifecycleUseCase, timeout_supervisor::TimeoutSupervisorUseCase,
    },
};
use domain::repositories::{
    boxes::BoxRepository, payment_refunds::PaymentRefundRepository, payments::PaymentRepository,
    sessions::SessionRepository,
};
use infra::{
    db::{
        postgres::postgres_connection,
        repositories::{
            boxes::BoxPostgres, payment_refunds::PaymentRefundPostgres, payments::PaymentPostgres,
            sessions::SessionPostgres,
        },
    },
    hardware::controller_client::ControllerClient,
    notifications::bot_api::BotApiNotifier,
    payments::acquiring_client::AcquiringClient,
};
use worker::{
    config::config_loader,
    services::{
        assigner_loop, notification_loop, refund_retry_loop, timeout_loop,
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(error) = run().await {
        error!("Worker exited with error: {}", error);
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    observability::init_observability("worker")?;

    let dotenvy_env = Arc::new(config_loader::load()?);
    info!("ENV has been loaded");

    let postgres_pool = postgres_connection::establish_connection(&dotenvy_env.database.url)?;
    info!("Postgres connection has been established");

    let db_pool = Arc::new(postgres_pool);

    let session_repo: Arc<dyn SessionRepository + Send + Sync> =
        Arc::new(SessionPostgres::new(Arc::clone(&db_pool)));
    let box_repo: Arc<dyn BoxRepository + Send + Sync> =
        Arc::new(BoxPostgres::new(Arc::clone(&db_pool)));
    let payment_repo: Arc<dyn PaymentRepository + Send + Sync> =
        Arc::new(PaymentPostgres::new(Arc::clone(&db_pool)));
    let refund_repo: Arc<dyn PaymentRefundRepository + Send + Sync> =
        Arc::new(PaymentRefundPostgres::new(Arc::clone(&db_pool)));

    let gateway: Arc<dyn PaymentGateway> = Arc::new(AcquiringClient::new(
        dotenvy_env.acquiring.base_url.clone(),
        dotenvy_env.acquiring.terminal_key.clone(),
        dotenvy_env.acquiring.webhook_secret.clone(),
        dotenvy_env.acquiring.success_url.clone(),
        dotenvy_env.acquiring.fail_url.clone(),
    ));
    let hardware: Arc<dyn HardwareController> = Arc::new(ControllerClient::new(
        dotenvy_env.hardware.base_url.clone(),
    ));
    let notifier: Arc<dyn NotificationSink> = Arc::new(BotApiNotifier::new(
        dotenvy_env.bot_api.base_url.clone(),
    ));

    let settings = EngineSettings {
        reservation_timeout: ChronoDuration::seconds(dotenvy_env.engine.reservation_timeout_secs),
        warning_lead: ChronoDuration::seconds(dotenvy_env.engine.warning_lead_secs),
        box_cooldown: ChronoDuration::seconds(dotenvy_env.engine.box_cooldown_secs),
        refund_max_retries: dotenvy_env.engine.refund_max_retries,
    };

    let lifecycle = Arc::new(SessionLifecycleUseCase::new(
        Arc::clone(&session_repo),
        Arc::clone(&box_repo),
        Arc::clone(&payment_repo),
        Arc::clone(&refund_repo),
        Arc::clone(&hardware),
        Arc::clone(&notifier),
        settings.clone(),
    ));

    let assigner = Arc::new(QueueAssignerUseCase::new(
        Arc::clone(&session_repo),
        Arc::clone(&box_repo),
        Arc::clone(&lifecycle),
    ));
    let timeout_supervisor = Arc::new(TimeoutSupervisorUseCase::new(
        Arc::clone(&session_repo),
        Arc::clone(&lifecycle),
        Arc::clone(&notifier),
        settings,
    ));
    let refund_retry = Arc::new(RefundRetryUseCase::new(
        Arc::clone(&refund_repo),
        Arc::clone(&payment_repo),
        Arc::clone(&gateway),
    ));

    let intervals = &dotenvy_env.intervals;
    let assigner_loop = tokio::spawn(assigner_loop::run_assigner_loop(
        assigner,
        Duration::from_secs(intervals.assigner_secs),
    ));
    let reservation_expiry_loop = tokio::spawn(timeout_loop::run_reservation_expiry_loop(
        Arc::clone(&timeout_supervisor),
        Duration::from_secs(intervals.reservation_sweep_secs),
    ));
    let auto_complete_loop = tokio::spawn(timeout_loop::run_auto_complete_loop(
        Arc::clone(&timeout_supervisor),
        Duration::from_secs(intervals.completion_sweep_secs),
    ));
    let notification_loop = tokio::spawn(notification_loop::run_notification_loop(
        timeout_supervisor,
        Duration::from_secs(intervals.notification_sweep_secs),
    ));
    let refund_retry_loop = tokio::spawn(refund_retry_loop::run_refund_retry_loop(
        refund_retry,
        Duration::from_secs(intervals.refund_sweep_secs),
    ));

    info!("Worker started");

    tokio::select! {
        result = assigner_loop => result??,
        result = reservation_expiry_loop => result??,
        result = auto_complete_loop => result??,
        result = notification_loop => result??,
        result = refund_retry_loop => result??,
    };

    Ok(())
}
