use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AttendanceStatus {
    Present,
    HalfDay,
}

/// One row per employee per day, keyed on `(employee_id, attendance_date)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Attendance {
    pub id: u64,
    pub employee_id: u64,
    pub attendance_date: NaiveDate,
    #[sqlx(try_from = "String")]
    pub status: AttendanceStatus,
    pub check_in: Option<NaiveDateTime>,
    pub check_out: Option<NaiveDateTime>,
    pub working_hours: f64,
    pub late_entry: bool,
    pub early_exit: bool,
    pub geofence_violation: bool,
    pub fingerprint_anomaly: bool,
    pub shift_type_id: Option<u64>,
    pub overtime_hours: Option<f64>,
    pub break_hours: Option<f64>,
    pub net_working_hours: Option<f64>,
}

/// Values the reconciliation engine writes for a day. The store turns this
/// into an insert or an in-place update of the existing row.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceUpsert {
    pub employee_id: u64,
    pub attendance_date: NaiveDate,
    pub status: AttendanceStatus,
    pub check_in: NaiveDateTime,
    pub check_out: NaiveDateTime,
    pub working_hours: f64,
    pub late_entry: bool,
    pub early_exit: bool,
    pub geofence_violation: bool,
    pub fingerprint_anomaly: bool,
    pub shift_type_id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OvertimeUpdate {
    pub overtime_hours: f64,
    pub break_hours: f64,
    pub net_working_hours: f64,
}
