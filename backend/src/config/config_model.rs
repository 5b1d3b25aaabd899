#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub server: Server,
    pub database: Database,
    pub acquiring: Acquiring,
    pub hardware: Hardware,
    pub bot_api: BotApi,
    pub webhook_pool: WebhookPool,
    pub pricing: Pricing,
    pub engine: Engine,
}

#[derive(Debug, Clone)]
pub struct Server {
    pub port: u16,
    pub body_limit: u64,
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct Acquiring {
    pub base_url: String,
    pub terminal_key: String,
    pub webhook_secret: String,
    pub success_url: String,
    pub fail_url: String,
}

#[derive(Debug, Clone)]
pub struct Hardware {
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct BotApi {
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct WebhookPool {
    pub queue_capacity: usize,
    pub workers: usize,
}

#[derive(Debug, Clone)]
pub struct Pricing {
    pub wash_per_minute_minor: i32,
    pub air_dry_per_minute_minor: i32,
    pub chemistry_surcharge_minor: i32,
    pub max_rental_minutes: i32,
}

#[derive(Debug, Clone)]
pub struct Engine {
    pub reservation_timeout_secs: i64,
    pub warning_lead_secs: i64,
    pub box_cooldown_secs: i64,
    pub refund_max_retries: i32,
}
