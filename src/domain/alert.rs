use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use super::types::{GeoLocation, Pollutant};

/// How long an alert stays active before the expiry sweep retires it.
pub const ALERT_TTL_HOURS: i64 = 24;

/// Stored alert severity. Must never understate the index value it was
/// saved with; see [`AlertRecord::enforce_severity_floor`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Severity {
    Moderate,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AlertStatus {
    Active,
    Expired,
    Cancelled,
}

/// A persisted health alert for one monitored location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: Uuid,
    pub location_id: String,
    pub location: GeoLocation,
    pub severity: Severity,
    pub index_value: u16,
    pub dominant: Pollutant,
    pub message: String,
    pub health_impact: String,
    pub created_at: DateTime<Utc>,
    pub status: AlertStatus,
    pub expires_at: DateTime<Utc>,
}

impl AlertRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        location_id: impl Into<String>,
        location: GeoLocation,
        severity: Severity,
        index_value: u16,
        dominant: Pollutant,
        message: impl Into<String>,
        health_impact: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let mut record = Self {
            id: Uuid::new_v4(),
            location_id: location_id.into(),
            location,
            severity,
            index_value,
            dominant,
            message: message.into(),
            health_impact: health_impact.into(),
            created_at,
            status: AlertStatus::Active,
            expires_at: created_at + Duration::hours(ALERT_TTL_HOURS),
        };
        record.enforce_severity_floor();
        record
    }

    /// Safety net applied before save: the stored severity may never
    /// understate the index. The threshold ladder normally classifies
    /// correctly on its own; this only matters when tiers have been
    /// reconfigured out from under an index value.
    pub fn enforce_severity_floor(&mut self) {
        if self.index_value > 200 && self.severity < Severity::Critical {
            self.severity = Severity::Critical;
        } else if self.index_value > 150 && self.severity < Severity::High {
            self.severity = Severity::High;
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
