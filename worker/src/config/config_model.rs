#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub database: Database,
    pub acquiring: Acquiring,
    pub hardware: Hardware,
    pub bot_api: BotApi,
    pub engine: Engine,
    pub intervals: Intervals,
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
pub struct Engine {
    pub reservation_timeout_secs: i64,
    pub warning_lead_secs: i64,
    pub box_cooldown_secs: i64,
    pub refund_max_retries: i32,
}

/// Tick periods of the independent background loops, in seconds.
#[derive(Debug, Clone)]
pub struct Intervals {
    pub assigner_secs: u64,
    pub reservation_sweep_secs: u64,
    pub completion_sweep_secs: u64,
    pub notification_sweep_secs: u64,
    pub refund_sweep_secs: u64,
}
