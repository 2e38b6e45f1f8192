use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::punch::{Direction, Punch, PunchSource};

/// Punch written by the device connector. Only `processed` is owned here.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BiometricCheckin {
    pub id: u64,
    pub employee_id: u64,
    pub time: NaiveDateTime,
    #[sqlx(try_from = "String")]
    pub direction: Direction,
    pub device_id: Option<String>,
    pub processed: bool,
}

impl BiometricCheckin {
    pub fn to_punch(&self) -> Punch {
        Punch {
            source: PunchSource::Biometric,
            id: self.id,
            employee_id: self.employee_id,
            time: self.time,
            direction: self.direction,
            within_geofence: None,
            fingerprint_risk: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewBiometricCheckin {
    pub employee_id: u64,
    pub time: NaiveDateTime,
    pub direction: Direction,
    pub device_id: Option<String>,
}
