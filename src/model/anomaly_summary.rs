use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Daily rollup of attendance anomalies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AnomalySummary {
    pub id: u64,
    pub summary_date: NaiveDate,
    pub generated_at: NaiveDateTime,
    pub geofence_violations: u32,
    pub fingerprint_anomalies: u32,
    pub late_entries: u32,
    pub early_exits: u32,
    /// Active employees with a shift but no punches and no attendance.
    pub missing_punches: u32,
    pub outside_geofence_checkins: u32,
    /// Distinct fingerprints carrying a risk flag that day.
    pub flagged_devices: u32,
}

impl AnomalySummary {
    pub fn has_anomalies(&self) -> bool {
        self.geofence_violations
            + self.fingerprint_anomalies
            + self.late_entries
            + self.early_exits
            + self.missing_punches
            > 0
    }
}
