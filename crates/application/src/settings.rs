use chrono::Duration;

use domain::value_objects::enums::service_types::ServiceType;

/// Engine tunables shared by the lifecycle, the sweeps, and the refund retry.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// How long an `assigned` session may wait before the reservation expires.
    pub reservation_timeout: Duration,
    /// Lead time for the one-shot pre-deadline notifications.
    pub warning_lead: Duration,
    /// Cooldown a box enters after a session releases it.
    pub box_cooldown: Duration,
    /// Retry budget for a single refund before it goes terminal.
    pub refund_max_retries: i32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            reservation_timeout: Duration::minutes(3),
            warning_lead: Duration::seconds(60),
            box_cooldown: Duration::seconds(0),
            refund_max_retries: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PricingConfig {
    pub wash_per_minute_minor: i32,
    pub air_dry_per_minute_minor: i32,
    pub chemistry_surcharge_minor: i32,
    pub max_rental_minutes: i32,
}

impl PricingConfig {
    pub fn booking_amount_minor(
        &self,
        service_type: ServiceType,
        minutes: i32,
        with_chemistry: bool,
    ) -> i32 {
        let per_minute = match service_type {
            ServiceType::Wash => self.wash_per_minute_minor,
            ServiceType::AirDry => self.air_dry_per_minute_minor,
        };
        let surcharge = if with_chemistry {
            self.chemistry_surcharge_minor
        } else {
            0
        };
        per_minute * minutes + surcharge
    }

    pub fn extension_amount_minor(&self, service_type: ServiceType, minutes: i32) -> i32 {
        let per_minute = match service_type {
            ServiceType::Wash => self.wash_per_minute_minor,
            ServiceType::AirDry => self.air_dry_per_minute_minor,
        };
        per_minute * minutes
    }
}
