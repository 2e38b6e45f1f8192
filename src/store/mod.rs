//! Persistence seam for the attendance engine.
//!
//! Production runs on [`mysql::MySqlStore`]; tests use the in-memory
//! store so the engine can be exercised without a database.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use crate::error::Result;
use crate::model::{
    anomaly_summary::AnomalySummary,
    attendance::{Attendance, AttendanceUpsert, OvertimeUpdate},
    biometric_checkin::{BiometricCheckin, NewBiometricCheckin},
    employee::Employee,
    mobile_checkin::{MobileCheckin, NewMobileCheckin, RiskFlag},
    processor_log::{NewProcessorLog, ProcessorLog},
    punch::{Direction, Punch},
    shift_type::ShiftType,
    tour_plan::TourPlan,
    work_site::WorkSite,
};

#[cfg(test)]
pub mod memory;
pub mod mysql;

pub type SharedStore = Arc<dyn AttendanceStore>;

/// Time ranges are inclusive on both ends.
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    // ---- reference data ----
    async fn find_employee(&self, id: u64) -> Result<Option<Employee>>;
    async fn find_employee_by_device_id(&self, device_user_id: &str) -> Result<Option<Employee>>;
    async fn active_employees(&self) -> Result<Vec<Employee>>;
    async fn find_shift_type(&self, id: u64) -> Result<Option<ShiftType>>;
    async fn find_work_site(&self, id: u64) -> Result<Option<WorkSite>>;
    async fn active_work_sites(&self) -> Result<Vec<WorkSite>>;
    /// The Active tour plan covering `date`, if any.
    async fn active_tour_plan(&self, employee_id: u64, date: NaiveDate) -> Result<Option<TourPlan>>;

    // ---- punches ----
    async fn employees_with_pending_punches(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<u64>>;
    /// Unprocessed punches from both sources, in no particular order.
    async fn pending_punches(
        &self,
        employee_id: u64,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<Punch>>;
    /// All punches from both sources, processed or not.
    async fn punches_between(
        &self,
        employee_id: u64,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<Punch>>;
    async fn employees_with_punches_between(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<HashSet<u64>>;
    /// Sets the processed flag; mobile punches also get the batch id.
    async fn mark_punches_processed(&self, punches: &[Punch], batch_id: &str) -> Result<()>;

    async fn insert_mobile_checkin(&self, checkin: NewMobileCheckin) -> Result<MobileCheckin>;
    async fn mobile_checkins_between(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<MobileCheckin>>;
    async fn set_fingerprint_risk(&self, checkin_id: u64, risk: RiskFlag) -> Result<()>;

    async fn biometric_punch_exists(
        &self,
        employee_id: u64,
        time: NaiveDateTime,
        direction: Direction,
    ) -> Result<bool>;
    async fn insert_biometric_checkin(&self, checkin: NewBiometricCheckin) -> Result<BiometricCheckin>;

    // ---- attendance ----
    async fn find_attendance(&self, employee_id: u64, date: NaiveDate) -> Result<Option<Attendance>>;
    /// Inserts, or updates in place the row for `(employee_id, attendance_date)`.
    async fn upsert_attendance(&self, values: &AttendanceUpsert) -> Result<Attendance>;
    async fn attendance_on(&self, date: NaiveDate) -> Result<Vec<Attendance>>;
    async fn attendance_between(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Attendance>>;
    async fn update_overtime(&self, attendance_id: u64, update: &OvertimeUpdate) -> Result<()>;

    // ---- audit ----
    async fn insert_processor_log(&self, log: &NewProcessorLog) -> Result<ProcessorLog>;
    async fn recent_processor_logs(&self, limit: u32) -> Result<Vec<ProcessorLog>>;
    async fn insert_anomaly_summary(&self, summary: &AnomalySummary) -> Result<AnomalySummary>;
}
