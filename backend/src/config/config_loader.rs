use anyhow::Result;

use super::config_model::{
    Acquiring, BotApi, Database, DotEnvyConfig, Engine, Hardware, Pricing, Server, WebhookPool,
};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let server = Server {
        port: std::env::var("SERVER_PORT")
            .expect("SERVER_PORT is invalid")
            .parse()?,
        body_limit: std::env::var("SERVER_BODY_LIMIT")
            .unwrap_or_else(|_| "10".to_string())
            .parse()?,
        timeout: std::env::var("SERVER_TIMEOUT")
            .unwrap_or_else(|_| "30".to_string())
            .parse()?,
    };

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

    let webhook_pool = WebhookPool {
        queue_capacity: std::env::var("WEBHOOK_QUEUE_CAPACITY")
            .unwrap_or_else(|_| "64".to_string())
            .parse()?,
        workers: std::env::var("WEBHOOK_WORKERS")
            .unwrap_or_else(|_| "4".to_string())
            .parse()?,
    };

    let pricing = Pricing {
        wash_per_minute_minor: std::env::var("PRICE_WASH_PER_MINUTE")
            .expect("PRICE_WASH_PER_MINUTE is invalid")
            .parse()?,
        air_dry_per_minute_minor: std::env::var("PRICE_AIR_DRY_PER_MINUTE")
            .expect("PRICE_AIR_DRY_PER_MINUTE is invalid")
            .parse()?,
        chemistry_surcharge_minor: std::env::var("PRICE_CHEMISTRY_SURCHARGE")
            .unwrap_or_else(|_| "0".to_string())
            .parse()?,
        max_rental_minutes: std::env::var("MAX_RENTAL_MINUTES")
            .unwrap_or_else(|_| "120".to_string())
            .parse()?,
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

    Ok(DotEnvyConfig {
        server,
        database,
        acquiring,
        hardware,
        bot_api,
        webhook_pool,
        pricing,
        engine,
    })
}
