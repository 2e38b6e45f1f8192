use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use super::punch::{Direction, Punch, PunchSource};

/// Device fingerprint risk. Variants are ordered by severity so a stored
/// flag is only ever raised, never lowered.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum RiskFlag {
    #[default]
    None,
    HighFrequency,
    SharedDevice,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct MobileCheckin {
    pub id: u64,
    pub employee_id: u64,
    #[schema(value_type = String, format = DateTime)]
    pub time: NaiveDateTime,
    #[sqlx(try_from = "String")]
    pub direction: Direction,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub gps_accuracy: Option<f64>,
    pub within_geofence: bool,
    pub distance_meters: Option<f64>,
    pub work_site_id: Option<u64>,
    pub device_fingerprint: Option<String>,
    #[sqlx(try_from = "String")]
    pub fingerprint_risk: RiskFlag,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub processed: bool,
    pub processing_batch: Option<String>,
}

impl MobileCheckin {
    pub fn to_punch(&self) -> Punch {
        Punch {
            source: PunchSource::Mobile,
            id: self.id,
            employee_id: self.employee_id,
            time: self.time,
            direction: self.direction,
            within_geofence: Some(self.within_geofence),
            fingerprint_risk: Some(self.fingerprint_risk),
        }
    }
}

/// A mobile punch as submitted, before it has an id.
#[derive(Debug, Clone)]
pub struct NewMobileCheckin {
    pub employee_id: u64,
    pub time: NaiveDateTime,
    pub direction: Direction,
    pub latitude: f64,
    pub longitude: f64,
    pub gps_accuracy: Option<f64>,
    pub within_geofence: bool,
    /// `None` when the distance could not be computed.
    pub distance_meters: Option<f64>,
    pub work_site_id: Option<u64>,
    pub device_fingerprint: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}
