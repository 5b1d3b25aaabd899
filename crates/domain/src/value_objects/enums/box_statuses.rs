use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BoxStatus {
    Free,
    Reserved,
    Busy,
    Maintenance,
    Cleaning,
}

impl BoxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoxStatus::Free => "free",
            BoxStatus::Reserved => "reserved",
            BoxStatus::Busy => "busy",
            BoxStatus::Maintenance => "maintenance",
            BoxStatus::Cleaning => "cleaning",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "free" => Some(BoxStatus::Free),
            "reserved" => Some(BoxStatus::Reserved),
            "busy" => Some(BoxStatus::Busy),
            "maintenance" => Some(BoxStatus::Maintenance),
            "cleaning" => Some(BoxStatus::Cleaning),
            _ => None,
        }
    }
}

impl Display for BoxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
