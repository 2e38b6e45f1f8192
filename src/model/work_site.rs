use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AttendanceError;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct WorkSite {
    pub id: u64,
    pub organization: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Geofence radius in meters.
    pub radius: f64,
    pub active: bool,
    /// Shift worked by employees touring this site, if it differs from
    /// their own.
    pub shift_type_id: Option<u64>,
}

impl WorkSite {
    pub fn validate(&self) -> Result<(), AttendanceError> {
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(AttendanceError::validation(format!(
                "work site {} radius must be positive",
                self.id
            )));
        }
        if !valid_coordinate(self.latitude, self.longitude) {
            return Err(AttendanceError::validation(format!(
                "work site {} has invalid coordinates",
                self.id
            )));
        }
        Ok(())
    }
}

pub fn valid_coordinate(latitude: f64, longitude: f64) -> bool {
    latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude)
}
