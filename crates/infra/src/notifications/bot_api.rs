use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use application::interfaces::notifications::NotificationSink;
use domain::value_objects::notifications::NotificationKind;

/// Forwards customer notifications to the Telegram bot service, which owns
/// the chat mapping and the actual delivery.
pub struct BotApiNotifier {
    http: reqwest::Client,
    base_url: String,
}

impl BotApiNotifier {
    pub fn new(base_url: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(3))
            .build()
            .expect("reqwest client must build");

        Self { http, base_url }
    }
}

#[async_trait]
impl NotificationSink for BotApiNotifier {
    async fn send(&self, user_id: Uuid, kind: NotificationKind) -> Result<()> {
        let response = self
            .http
            .post(format!("{}/internal/notifications", self.base_url))
            .json(&json!({
                "user_id": user_id,
                "notification": kind,
            }))
            .send()
            .await
            .map_err(sanitize_reqwest_error)?;

        if response.status().is_success() {
            return Ok(());
        }

        Err(anyhow!(
            "bot api returned non-success status: {}",
            response.status()
        ))
    }
}

fn sanitize_reqwest_error(error: reqwest::Error) -> anyhow::Error {
    if error.is_timeout() {
        return anyhow!("bot api request timed out");
    }
    if error.is_connect() {
        return anyhow!("bot api connection failed");
    }
    anyhow!("bot api request failed")
}
