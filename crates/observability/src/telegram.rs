use super::notifier::{NotificationEvent, NotificationProvider};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::Client;
use serde_json::json;

pub(crate) struct TelegramAlertProvider {
    bot_token: String,
    chat_id: String,
    client: Client,
}

impl TelegramAlertProvider {
    pub(crate) fn new(bot_token: String, chat_id: String) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(3))
            .build()
            .expect("reqwest client must build");

        Self {
            bot_token,
            chat_id,
            client,
        }
    }

    fn format_content(&self, event: &NotificationEvent) -> String {
        let mut lines = Vec::new();

        lines.push(format!(
            "{} [{}] {} {}",
            event.service_name,
            event.environment,
            event.component,
            event.level.as_str()
        ));
        lines.push(format!(
            "{} {}",
            event.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            event.target
        ));

        if let Some(message) = event.message.as_ref().filter(|m| !m.trim().is_empty()) {
            lines.push(message.trim().to_string());
        }

        for (key, value) in &event.fields {
            lines.push(format!("{key} = {value}"));
        }

        truncate_for_telegram(lines.join("\n"))
    }
}

#[async_trait]
impl NotificationProvider for TelegramAlertProvider {
    async fn send(&self, event: &NotificationEvent) -> Result<()> {
        let content = self.format_content(event);

        let response = self
            .client
            .post(format!(
                "https://api.telegram.org/bot{}/sendMessage",
                self.bot_token
            ))
            .json(&json!({
                "chat_id": self.chat_id,
                "text": content,
            }))
            .send()
            .await
            .map_err(sanitize_reqwest_error)?;

        if response.status().is_success() {
            return Ok(());
        }

        Err(anyhow!(
            "telegram api returned non-success status: {}",
            response.status()
        ))
    }

    fn provider_name(&self) -> &'static str {
        "telegram"
    }
}

fn sanitize_reqwest_error(error: reqwest::Error) -> anyhow::Error {
    if error.is_timeout() {
        return anyhow!("telegram api request timed out");
    }
    if error.is_connect() {
        return anyhow!("telegram api connection failed");
    }
    anyhow!("telegram api request failed")
}

fn truncate_for_telegram(mut content: String) -> String {
    const LIMIT: usize = 4096;
    const SUFFIX: &str = "\n… (truncated)";

    if content.chars().count() <= LIMIT {
        return content;
    }

    let allowed = LIMIT.saturating_sub(SUFFIX.chars().count());
    let truncated: String = content.chars().take(allowed).collect();
    content.clear();
    content.push_str(&truncated);
    content.push_str(SUFFIX);
    content
}
