use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationKind {
    BoxAssigned { box_number: i32 },
    ReservationExpiringSoon { box_number: i32 },
    ReservationExpired,
    SessionExpiringSoon { box_number: i32 },
    SessionAutoCompleted { box_number: i32 },
}
