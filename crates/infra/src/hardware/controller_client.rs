use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use application::interfaces::hardware::{HardwareController, HardwareError};

/// HTTP bridge to the box controller service that owns the actual coil bus.
pub struct ControllerClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct WriteCoilRequest {
    box_number: i32,
    register: u16,
    value: bool,
}

impl ControllerClient {
    pub fn new(base_url: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("reqwest client must build");

        Self { http, base_url }
    }
}

#[async_trait]
impl HardwareController for ControllerClient {
    async fn write_coil(
        &self,
        box_number: i32,
        register: u16,
        value: bool,
    ) -> Result<(), HardwareError> {
        debug!(box_number, register, value, "writing coil");

        let resp = self
            .http
            .post(format!("{}/api/v1/coils", self.base_url))
            .json(&WriteCoilRequest {
                box_number,
                register,
                value,
            })
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    HardwareError::Timeout
                } else {
                    HardwareError::Unavailable(err.to_string())
                }
            })?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        if status == reqwest::StatusCode::UNPROCESSABLE_ENTITY
            || status == reqwest::StatusCode::NOT_FOUND
        {
            return Err(HardwareError::InvalidRegister(register));
        }
        Err(HardwareError::Unavailable(format!(
            "controller returned status {status}"
        )))
    }
}
