use tracing::Level;

#[derive(Clone, Debug)]
pub(crate) struct ServiceContext {
    pub(crate) service_name: String,
    pub(crate) environment: String,
    pub(crate) component: String,
}

#[derive(Clone, Debug)]
pub(crate) struct TelegramAlerts {
    pub(crate) bot_token: String,
    pub(crate) chat_id: String,
    pub(crate) min_level: Level,
}

#[derive(Clone, Debug)]
pub(crate) struct ObservabilityConfig {
    pub(crate) service_context: ServiceContext,
    pub(crate) telegram: Option<TelegramAlerts>,
    pub(crate) warnings: Vec<String>,
}

impl ObservabilityConfig {
    pub(crate) fn from_env(component: &str) -> Self {
        let mut warnings = Vec::new();

        let service_context = ServiceContext {
            service_name: std::env::var("SERVICE_NAME").unwrap_or_else(|_| "washbay".to_string()),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "local".to_string()),
            component: component.to_string(),
        };

        let bot_token = std::env::var("OPS_ALERT_BOT_TOKEN").ok();
        let chat_id = std::env::var("OPS_ALERT_CHAT_ID").ok();
        let telegram = match (bot_token, chat_id) {
            (Some(bot_token), Some(chat_id)) => {
                let min_level = match std::env::var("OPS_ALERT_MIN_LEVEL").ok().as_deref() {
                    None => Level::ERROR,
                    Some(raw) => raw.parse().unwrap_or_else(|_| {
                        warnings.push(format!(
                            "OPS_ALERT_MIN_LEVEL is not a valid level: {raw}; using error"
                        ));
                        Level::ERROR
                    }),
                };
                Some(TelegramAlerts {
                    bot_token,
                    chat_id,
                    min_level,
                })
            }
            (Some(_), None) => {
                warnings.push("OPS_ALERT_BOT_TOKEN is set but OPS_ALERT_CHAT_ID is missing".into());
                None
            }
            (None, Some(_)) => {
                warnings.push("OPS_ALERT_CHAT_ID is set but OPS_ALERT_BOT_TOKEN is missing".into());
                None
            }
            (None, None) => None,
        };

        Self {
            service_context,
            telegram,
            warnings,
        }
    }
}
