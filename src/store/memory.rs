use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use super::AttendanceStore;
use crate::error::{AttendanceError, Result};
use crate::model::{
    anomaly_summary::AnomalySummary,
    attendance::{Attendance, AttendanceUpsert, OvertimeUpdate},
    biometric_checkin::{BiometricCheckin, NewBiometricCheckin},
    employee::Employee,
    mobile_checkin::{MobileCheckin, NewMobileCheckin, RiskFlag},
    processor_log::{NewProcessorLog, ProcessorLog},
    punch::{Direction, Punch, PunchSource},
    shift_type::ShiftType,
    tour_plan::{TourPlan, TourPlanStatus},
    work_site::WorkSite,
};

#[derive(Default)]
pub struct Tables {
    pub employees: Vec<Employee>,
    pub shift_types: Vec<ShiftType>,
    pub work_sites: Vec<WorkSite>,
    pub tour_plans: Vec<TourPlan>,
    pub biometric: Vec<BiometricCheckin>,
    pub mobile: Vec<MobileCheckin>,
    pub attendance: Vec<Attendance>,
    pub processor_logs: Vec<ProcessorLog>,
    pub summaries: Vec<AnomalySummary>,
    next_id: u64,
}

impl Tables {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Vec-backed store for tests.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    failing: Mutex<HashSet<&'static str>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().expect("memory store poisoned")
    }

    /// Makes every later call of the named operation fail as if the
    /// database were down.
    pub fn fail_on(&self, operation: &'static str) {
        self.failing.lock().expect("memory store poisoned").insert(operation);
    }

    fn check(&self, operation: &'static str) -> Result<()> {
        if self.failing.lock().expect("memory store poisoned").contains(operation) {
            return Err(AttendanceError::Store(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    pub fn add_employee(&self, employee: Employee) {
        self.tables().employees.push(employee);
    }

    pub fn add_shift_type(&self, shift: ShiftType) {
        self.tables().shift_types.push(shift);
    }

    pub fn add_work_site(&self, site: WorkSite) {
        self.tables().work_sites.push(site);
    }

    pub fn add_tour_plan(&self, plan: TourPlan) {
        self.tables().tour_plans.push(plan);
    }

    pub fn add_biometric(&self, employee_id: u64, time: NaiveDateTime, direction: Direction) -> u64 {
        let mut tables = self.tables();
        let id = tables.next_id();
        tables.biometric.push(BiometricCheckin {
            id,
            employee_id,
            time,
            direction,
            device_id: None,
            processed: false,
        });
        id
    }

    /// Seeds a raw mobile check-in, bypassing the clock-in service.
    pub fn add_mobile(&self, mut checkin: MobileCheckin) -> u64 {
        let mut tables = self.tables();
        checkin.id = tables.next_id();
        let id = checkin.id;
        tables.mobile.push(checkin);
        id
    }
}

fn in_range(time: NaiveDateTime, from: NaiveDateTime, to: NaiveDateTime) -> bool {
    from <= time && time <= to
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn find_employee(&self, id: u64) -> Result<Option<Employee>> {
        self.check("find_employee")?;
        Ok(self.tables().employees.iter().find(|e| e.id == id).cloned())
    }

    async fn find_employee_by_device_id(&self, device_user_id: &str) -> Result<Option<Employee>> {
        Ok(self
            .tables()
            .employees
            .iter()
            .find(|e| e.attendance_device_id.as_deref() == Some(device_user_id))
            .cloned())
    }

    async fn active_employees(&self) -> Result<Vec<Employee>> {
        Ok(self
            .tables()
            .employees
            .iter()
            .filter(|e| e.is_active())
            .cloned()
            .collect())
    }

    async fn find_shift_type(&self, id: u64) -> Result<Option<ShiftType>> {
        Ok(self.tables().shift_types.iter().find(|s| s.id == id).cloned())
    }

    async fn find_work_site(&self, id: u64) -> Result<Option<WorkSite>> {
        Ok(self.tables().work_sites.iter().find(|s| s.id == id).cloned())
    }

    async fn active_work_sites(&self) -> Result<Vec<WorkSite>> {
        Ok(self
            .tables()
            .work_sites
            .iter()
            .filter(|s| s.active)
            .cloned()
            .collect())
    }

    async fn active_tour_plan(&self, employee_id: u64, date: NaiveDate) -> Result<Option<TourPlan>> {
        Ok(self
            .tables()
            .tour_plans
            .iter()
            .find(|p| {
                p.employee_id == employee_id && p.status == TourPlanStatus::Active && p.covers(date)
            })
            .cloned())
    }

    async fn employees_with_pending_punches(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<u64>> {
        self.check("employees_with_pending_punches")?;
        let tables = self.tables();
        let mut ids: Vec<u64> = tables
            .biometric
            .iter()
            .filter(|c| !c.processed && in_range(c.time, from, to))
            .map(|c| c.employee_id)
            .chain(
                tables
                    .mobile
                    .iter()
                    .filter(|c| !c.processed && in_range(c.time, from, to))
                    .map(|c| c.employee_id),
            )
            .collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    async fn pending_punches(
        &self,
        employee_id: u64,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<Punch>> {
        self.check("pending_punches")?;
        let tables = self.tables();
        Ok(tables
            .biometric
            .iter()
            .filter(|c| c.employee_id == employee_id && !c.processed && in_range(c.time, from, to))
            .map(BiometricCheckin::to_punch)
            .chain(
                tables
                    .mobile
                    .iter()
                    .filter(|c| {
                        c.employee_id == employee_id && !c.processed && in_range(c.time, from, to)
                    })
                    .map(MobileCheckin::to_punch),
            )
            .collect())
    }

    async fn punches_between(
        &self,
        employee_id: u64,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<Punch>> {
        let tables = self.tables();
        Ok(tables
            .biometric
            .iter()
            .filter(|c| c.employee_id == employee_id && in_range(c.time, from, to))
            .map(BiometricCheckin::to_punch)
            .chain(
                tables
                    .mobile
                    .iter()
                    .filter(|c| c.employee_id == employee_id && in_range(c.time, from, to))
                    .map(MobileCheckin::to_punch),
            )
            .collect())
    }

    async fn employees_with_punches_between(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<HashSet<u64>> {
        let tables = self.tables();
        Ok(tables
            .biometric
            .iter()
            .filter(|c| in_range(c.time, from, to))
            .map(|c| c.employee_id)
            .chain(
                tables
                    .mobile
                    .iter()
                    .filter(|c| in_range(c.time, from, to))
                    .map(|c| c.employee_id),
            )
            .collect())
    }

    async fn mark_punches_processed(&self, punches: &[Punch], batch_id: &str) -> Result<()> {
        self.check("mark_punches_processed")?;
        let mut tables = self.tables();
        for punch in punches {
            match punch.source {
                PunchSource::Biometric => {
                    if let Some(row) = tables.biometric.iter_mut().find(|c| c.id == punch.id) {
                        row.processed = true;
                    }
                }
                PunchSource::Mobile => {
                    if let Some(row) = tables.mobile.iter_mut().find(|c| c.id == punch.id) {
                        row.processed = true;
                        row.processing_batch = Some(batch_id.to_string());
                    }
                }
            }
        }
        Ok(())
    }

    async fn insert_mobile_checkin(&self, checkin: NewMobileCheckin) -> Result<MobileCheckin> {
        let mut tables = self.tables();
        let row = MobileCheckin {
            id: tables.next_id(),
            employee_id: checkin.employee_id,
            time: checkin.time,
            direction: checkin.direction,
            latitude: Some(checkin.latitude),
            longitude: Some(checkin.longitude),
            gps_accuracy: checkin.gps_accuracy,
            within_geofence: checkin.within_geofence,
            distance_meters: checkin.distance_meters,
            work_site_id: checkin.work_site_id,
            device_fingerprint: Some(checkin.device_fingerprint),
            fingerprint_risk: RiskFlag::None,
            ip_address: checkin.ip_address,
            user_agent: checkin.user_agent,
            processed: false,
            processing_batch: None,
        };
        tables.mobile.push(row.clone());
        Ok(row)
    }

    async fn mobile_checkins_between(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<MobileCheckin>> {
        self.check("mobile_checkins_between")?;
        let mut rows: Vec<MobileCheckin> = self
            .tables()
            .mobile
            .iter()
            .filter(|c| in_range(c.time, from, to))
            .cloned()
            .collect();
        rows.sort_by_key(|c| c.time);
        Ok(rows)
    }

    async fn set_fingerprint_risk(&self, checkin_id: u64, risk: RiskFlag) -> Result<()> {
        self.check("set_fingerprint_risk")?;
        if let Some(row) = self.tables().mobile.iter_mut().find(|c| c.id == checkin_id) {
            row.fingerprint_risk = risk;
        }
        Ok(())
    }

    async fn biometric_punch_exists(
        &self,
        employee_id: u64,
        time: NaiveDateTime,
        direction: Direction,
    ) -> Result<bool> {
        Ok(self
            .tables()
            .biometric
            .iter()
            .any(|c| c.employee_id == employee_id && c.time == time && c.direction == direction))
    }

    async fn insert_biometric_checkin(&self, checkin: NewBiometricCheckin) -> Result<BiometricCheckin> {
        let mut tables = self.tables();
        let row = BiometricCheckin {
            id: tables.next_id(),
            employee_id: checkin.employee_id,
            time: checkin.time,
            direction: checkin.direction,
            device_id: checkin.device_id,
            processed: false,
        };
        tables.biometric.push(row.clone());
        Ok(row)
    }

    async fn find_attendance(&self, employee_id: u64, date: NaiveDate) -> Result<Option<Attendance>> {
        self.check("find_attendance")?;
        Ok(self
            .tables()
            .attendance
            .iter()
            .find(|a| a.employee_id == employee_id && a.attendance_date == date)
            .cloned())
    }

    async fn upsert_attendance(&self, values: &AttendanceUpsert) -> Result<Attendance> {
        self.check("upsert_attendance")?;
        let mut tables = self.tables();
        let existing = tables
            .attendance
            .iter()
            .position(|a| a.employee_id == values.employee_id && a.attendance_date == values.attendance_date);

        let index = match existing {
            Some(index) => index,
            None => {
                let id = tables.next_id();
                tables.attendance.push(Attendance {
                    id,
                    employee_id: values.employee_id,
                    attendance_date: values.attendance_date,
                    status: values.status,
                    check_in: None,
                    check_out: None,
                    working_hours: 0.0,
                    late_entry: false,
                    early_exit: false,
                    geofence_violation: false,
                    fingerprint_anomaly: false,
                    shift_type_id: None,
                    overtime_hours: None,
                    break_hours: None,
                    net_working_hours: None,
                });
                tables.attendance.len() - 1
            }
        };

        let row = &mut tables.attendance[index];
        row.status = values.status;
        row.check_in = Some(values.check_in);
        row.check_out = Some(values.check_out);
        row.working_hours = values.working_hours;
        row.late_entry = values.late_entry;
        row.early_exit = values.early_exit;
        row.geofence_violation = values.geofence_violation;
        row.fingerprint_anomaly = values.fingerprint_anomaly;
        row.shift_type_id = Some(values.shift_type_id);
        Ok(row.clone())
    }

    async fn attendance_on(&self, date: NaiveDate) -> Result<Vec<Attendance>> {
        Ok(self
            .tables()
            .attendance
            .iter()
            .filter(|a| a.attendance_date == date)
            .cloned()
            .collect())
    }

    async fn attendance_between(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Attendance>> {
        let mut rows: Vec<Attendance> = self
            .tables()
            .attendance
            .iter()
            .filter(|a| a.employee_id == employee_id && from <= a.attendance_date && a.attendance_date <= to)
            .cloned()
            .collect();
        rows.sort_by_key(|a| a.attendance_date);
        Ok(rows)
    }

    async fn update_overtime(&self, attendance_id: u64, update: &OvertimeUpdate) -> Result<()> {
        if let Some(row) = self.tables().attendance.iter_mut().find(|a| a.id == attendance_id) {
            row.overtime_hours = Some(update.overtime_hours);
            row.break_hours = Some(update.break_hours);
            row.net_working_hours = Some(update.net_working_hours);
        }
        Ok(())
    }

    async fn insert_processor_log(&self, log: &NewProcessorLog) -> Result<ProcessorLog> {
        let mut tables = self.tables();
        let row = ProcessorLog {
            id: tables.next_id(),
            batch_id: log.batch_id.clone(),
            run_time: log.run_time,
            from_date: log.from_date,
            to_date: log.to_date,
            run_trigger: log.run_trigger,
            status: log.status,
            total_processed: log.total_processed,
            error_count: log.error_count,
            errors: log.errors.join("\n"),
        };
        tables.processor_logs.push(row.clone());
        Ok(row)
    }

    async fn recent_processor_logs(&self, limit: u32) -> Result<Vec<ProcessorLog>> {
        Ok(self
            .tables()
            .processor_logs
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn insert_anomaly_summary(&self, summary: &AnomalySummary) -> Result<AnomalySummary> {
        let mut tables = self.tables();
        let row = AnomalySummary {
            id: tables.next_id(),
            ..summary.clone()
        };
        tables.summaries.push(row.clone());
        Ok(row)
    }
}
