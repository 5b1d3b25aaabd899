use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HardwareError {
    #[error("hardware controller unavailable: {0}")]
    Unavailable(String),
    #[error("invalid coil register {0}")]
    InvalidRegister(u16),
    #[error("hardware controller timed out")]
    Timeout,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HardwareController: Send + Sync {
    /// Writes a single-bit coil register on the controller of the given box.
    async fn write_coil(
        &self,
        box_number: i32,
        register: u16,
        value: bool,
    ) -> Result<(), HardwareError>;
}
