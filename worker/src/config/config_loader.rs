use anyhow::Result;

use super::config_model::{
    Acquiring, BotApi, Database, DotEnvyConfig, Engine, Hardware, Intervals,
};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let database = Database {
        url: std::env::var("DATABASE_URL").expect("DATABASE_URL is invalid"),
    };

    let acquiring = Acquiring {
        base_url: std::env::var("ACQUIRING_BASE_URL").expect("ACQUIRING_BASE_URL is invalid"),
        terminal_key: std::env::var("ACQUIRING_TERMINAL_KEY")
            .expect("ACQUIRING_TERMINAL_KEY is invalid"),
        webhook_secret: std::env::var("ACQUIRING_WEBHOOK_SECRET")
            .expect("ACQUIRING_WEBHOOK_SECRET is invalid"),
        success_url: std::env::var("ACQUIRING_SUCCESS_URL")
            .expect("ACQUIRING_SUCCESS_URL is invalid"),
        fail_url: std::env::var("ACQUIRING_FAIL_URL").expect("ACQUIRING_FAIL_URL is invalid"),
    };

    let hardware = Hardware {
        base_url: std::env::var("HARDWARE_BASE_URL").expect("HARDWARE_BASE_URL is invalid"),
    };

    let bot_api = BotApi {
        base_url: std::env::var("BOT_API_BASE_URL").expect("BOT_API_BASE_URL is invalid"),
    };

    let engine = Engine {
        reservation_timeout_secs: std::env::var("RESERVATION_TIMEOUT_SECS")
            .unwrap_or_else(|_| "180".to_string())
            .parse()?,
        warning_lead_secs: std::env::var("WARNING_LEAD_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()?,
        box_cooldown_secs: std::env::var("BOX_COOLDOWN_SECS")
            .unwrap_or_else(|_| "0".to_string())
            .parse()?,
        refund_max_retries: std::env::var("REFUND_MAX_RETRIES")
            .unwrap_or_else(|_| "5".to_string())
            .parse()?,
    };

    let intervals = Intervals {
        assigner_secs: std::env::var("ASSIGNER_INTERVAL_SECS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()?,
        reservation_sweep_secs: std::env::var("RESERVATION_SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()?,
        completion_sweep_secs: std::env::var("COMPLETION_SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()?,
        notification_sweep_secs: std::env::var("NOTIFICATION_SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| "15".to_string())
            .parse()?,
        refund_sweep_secs: std::env::var("REFUND_SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()?,
    };

    Ok(DotEnvyConfig {
        database,
        acquiring,
        hardware,
        bot_api,
        engine,
        intervals,
    })
}
