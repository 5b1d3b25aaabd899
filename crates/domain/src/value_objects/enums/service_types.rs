use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Wash,
    AirDry,
}

impl ServiceType {
    pub const ALL: [ServiceType; 2] = [ServiceType::Wash, ServiceType::AirDry];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Wash => "wash",
            ServiceType::AirDry => "air_dry",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "wash" => Some(ServiceType::Wash),
            "air_dry" => Some(ServiceType::AirDry),
            _ => None,
        }
    }
}

impl Display for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
