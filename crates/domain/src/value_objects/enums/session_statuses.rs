use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SessionStatus {
    Created,
    InQueue,
    Assigned,
    Active,
    Complete,
    Canceled,
    Expired,
    PaymentFailed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Created => "created",
            SessionStatus::InQueue => "in_queue",
            SessionStatus::Assigned => "assigned",
            SessionStatus::Active => "active",
            SessionStatus::Complete => "complete",
            SessionStatus::Canceled => "canceled",
            SessionStatus::Expired => "expired",
            SessionStatus::PaymentFailed => "payment_failed",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "created" => Some(SessionStatus::Created),
            "in_queue" => Some(SessionStatus::InQueue),
            "assigned" => Some(SessionStatus::Assigned),
            "active" => Some(SessionStatus::Active),
            "complete" => Some(SessionStatus::Complete),
            "canceled" => Some(SessionStatus::Canceled),
            "expired" => Some(SessionStatus::Expired),
            "payment_failed" => Some(SessionStatus::PaymentFailed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Complete
                | SessionStatus::Canceled
                | SessionStatus::Expired
                | SessionStatus::PaymentFailed
        )
    }

    /// Statuses a session may still be canceled from.
    pub fn cancelable() -> [SessionStatus; 3] {
        [
            SessionStatus::Created,
            SessionStatus::InQueue,
            SessionStatus::Assigned,
        ]
    }
}

impl Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
