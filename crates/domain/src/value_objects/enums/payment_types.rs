use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentType {
    Booking,
    Extension,
    Refund,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Booking => "booking",
            PaymentType::Extension => "extension",
            PaymentType::Refund => "refund",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "booking" => Some(PaymentType::Booking),
            "extension" => Some(PaymentType::Extension),
            "refund" => Some(PaymentType::Refund),
            _ => None,
        }
    }
}

impl Display for PaymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
