mod config;
mod layer;
mod notifier;
mod telegram;

use anyhow::Result;
use config::ObservabilityConfig;
use layer::ErrorNotifyLayer;
use notifier::Notifier;
use std::sync::Arc;
use telegram::TelegramAlertProvider;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Installs the tracing stack: an `EnvFilter` with a safe `info` default, a
/// fmt layer with local-time RFC 3339 timestamps, and (when configured) a
/// Telegram layer that forwards error-level events to the ops chat.
pub fn init_observability(component: &str) -> Result<()> {
    let config = ObservabilityConfig::from_env(component);

    let notify_layer = config.telegram.as_ref().map(|telegram| {
        let notifier = Notifier::new(vec![Arc::new(TelegramAlertProvider::new(
            telegram.bot_token.clone(),
            telegram.chat_id.clone(),
        ))]);

        ErrorNotifyLayer::new(notifier, config.service_context.clone(), telegram.min_level)
            .with_filter(tracing_subscriber::filter::LevelFilter::from_level(
                telegram.min_level,
            ))
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339());

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(notify_layer)
        .with(env_filter)
        .try_init()?;

    for warning in &config.warnings {
        warn!(
            service = %config.service_context.service_name,
            component = %config.service_context.component,
            warning = %warning,
            "Observability config warning"
        );
    }

    if config.telegram.is_some() {
        info!(
            service = %config.service_context.service_name,
            environment = %config.service_context.environment,
            component = %config.service_context.component,
            "Telegram error alerts enabled"
        );
    } else {
        info!(
            service = %config.service_context.service_name,
            environment = %config.service_context.environment,
            component = %config.service_context.component,
            "Telegram error alerts disabled"
        );
    }

    Ok(())
}
