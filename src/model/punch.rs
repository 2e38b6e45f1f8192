use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use super::mobile_checkin::RiskFlag;

/// Punch direction. `In` sorts before `Out`, which is the tie-break used
/// when two punches share a timestamp.
#[derive(
    Debug,
    Clone,
    Copy,
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
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    /// ZKTeco status codes: 0 check-in, 1 check-out, 2 break-out,
    /// 3 break-in, 4 OT-in, 5 OT-out. Unknown codes count as `In`.
    pub fn from_device_status(status: i32) -> Self {
        match status {
            1 | 2 | 5 => Direction::Out,
            _ => Direction::In,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PunchSource {
    Biometric,
    Mobile,
}

/// A punch from either intake source, flattened for reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct Punch {
    pub source: PunchSource,
    pub id: u64,
    pub employee_id: u64,
    pub time: NaiveDateTime,
    pub direction: Direction,
    /// Only mobile punches carry geofence and fingerprint data.
    pub within_geofence: Option<bool>,
    pub fingerprint_risk: Option<RiskFlag>,
}

impl Punch {
    pub fn is_outside_geofence(&self) -> bool {
        self.source == PunchSource::Mobile && self.within_geofence == Some(false)
    }

    pub fn has_fingerprint_risk(&self) -> bool {
        self.fingerprint_risk.is_some_and(|risk| risk != RiskFlag::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_status_codes_map_to_directions() {
        for status in [0, 3, 4, 9, -1] {
            assert_eq!(Direction::from_device_status(status), Direction::In);
        }
        for status in [1, 2, 5] {
            assert_eq!(Direction::from_device_status(status), Direction::Out);
        }
    }

    #[test]
    fn direction_parses_legacy_labels_case_insensitively() {
        assert_eq!("in".parse::<Direction>().unwrap(), Direction::In);
        assert_eq!("OUT".parse::<Direction>().unwrap(), Direction::Out);
        assert!("sideways".parse::<Direction>().is_err());
        assert!(Direction::In < Direction::Out);
    }
}
