use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use moka::future::Cache;
use sqlx::MySqlPool;
use tracing::debug;

use super::AttendanceStore;
use crate::error::Result;
use crate::model::{
    anomaly_summary::AnomalySummary,
    attendance::{Attendance, AttendanceUpsert, OvertimeUpdate},
    biometric_checkin::{BiometricCheckin, NewBiometricCheckin},
    employee::Employee,
    mobile_checkin::{MobileCheckin, NewMobileCheckin, RiskFlag},
    processor_log::{NewProcessorLog, ProcessorLog},
    punch::{Direction, Punch, PunchSource},
    shift_type::ShiftType,
    tour_plan::TourPlan,
    work_site::WorkSite,
};

const EMPLOYEE_COLUMNS: &str = "id, employee_code, first_name, last_name, status, \
     default_shift_type_id, default_work_site_id, attendance_device_id";

const MOBILE_COLUMNS: &str = "id, employee_id, time, direction, latitude, longitude, gps_accuracy, \
     within_geofence, distance_meters, work_site_id, device_fingerprint, fingerprint_risk, \
     ip_address, user_agent, processed, processing_batch";

const ATTENDANCE_COLUMNS: &str = "id, employee_id, attendance_date, status, check_in, check_out, \
     working_hours, late_entry, early_exit, geofence_violation, fingerprint_anomaly, \
     shift_type_id, overtime_hours, break_hours, net_working_hours";

const PROCESSOR_LOG_COLUMNS: &str = "id, batch_id, run_time, from_date, to_date, run_trigger, status, \
     total_processed, error_count, errors";

/// Shift types and work sites are read on every punch but only edited
/// through the host's admin screens, so they are cached briefly.
const REFERENCE_TTL: Duration = Duration::from_secs(300);

#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
    shift_types: Cache<u64, ShiftType>,
    work_sites: Cache<u64, WorkSite>,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self {
            pool,
            shift_types: Cache::builder()
                .max_capacity(1_000)
                .time_to_live(REFERENCE_TTL)
                .build(),
            work_sites: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(REFERENCE_TTL)
                .build(),
        }
    }

    async fn mobile_checkin_by_id(&self, id: u64) -> Result<MobileCheckin> {
        let sql = format!("SELECT {MOBILE_COLUMNS} FROM mobile_checkins WHERE id = ?");
        Ok(sqlx::query_as::<_, MobileCheckin>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn punches(
        &self,
        employee_id: u64,
        from: NaiveDateTime,
        to: NaiveDateTime,
        pending_only: bool,
    ) -> Result<Vec<Punch>> {
        let pending = if pending_only { "AND processed = FALSE" } else { "" };

        let biometric_sql = format!(
            "SELECT id, employee_id, time, direction, device_id, processed \
             FROM biometric_checkins \
             WHERE employee_id = ? AND time BETWEEN ? AND ? {pending}"
        );
        let biometric = sqlx::query_as::<_, BiometricCheckin>(&biometric_sql)
            .bind(employee_id)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;

        let mobile_sql = format!(
            "SELECT {MOBILE_COLUMNS} FROM mobile_checkins \
             WHERE employee_id = ? AND time BETWEEN ? AND ? {pending}"
        );
        let mobile = sqlx::query_as::<_, MobileCheckin>(&mobile_sql)
            .bind(employee_id)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;

        Ok(biometric
            .iter()
            .map(BiometricCheckin::to_punch)
            .chain(mobile.iter().map(MobileCheckin::to_punch))
            .collect())
    }
}

#[async_trait]
impl AttendanceStore for MySqlStore {
    async fn find_employee(&self, id: u64) -> Result<Option<Employee>> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?");
        Ok(sqlx::query_as::<_, Employee>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_employee_by_device_id(&self, device_user_id: &str) -> Result<Option<Employee>> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE attendance_device_id = ?");
        Ok(sqlx::query_as::<_, Employee>(&sql)
            .bind(device_user_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn active_employees(&self) -> Result<Vec<Employee>> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE status = 'active'");
        Ok(sqlx::query_as::<_, Employee>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn find_shift_type(&self, id: u64) -> Result<Option<ShiftType>> {
        if let Some(shift) = self.shift_types.get(&id).await {
            return Ok(Some(shift));
        }

        let shift = sqlx::query_as::<_, ShiftType>(
            r#"
            SELECT id, name, start_time, end_time, grace_minutes, min_working_hours,
                   overtime_threshold_hours, overtime_multiplier
            FROM shift_types
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(shift) = &shift {
            self.shift_types.insert(id, shift.clone()).await;
        }
        Ok(shift)
    }

    async fn find_work_site(&self, id: u64) -> Result<Option<WorkSite>> {
        if let Some(site) = self.work_sites.get(&id).await {
            return Ok(Some(site));
        }

        let site = sqlx::query_as::<_, WorkSite>(
            r#"
            SELECT id, organization, name, latitude, longitude, radius, active, shift_type_id
            FROM work_sites
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(site) = &site {
            self.work_sites.insert(id, site.clone()).await;
        }
        Ok(site)
    }

    async fn active_work_sites(&self) -> Result<Vec<WorkSite>> {
        Ok(sqlx::query_as::<_, WorkSite>(
            r#"
            SELECT id, organization, name, latitude, longitude, radius, active, shift_type_id
            FROM work_sites
            WHERE active = TRUE
            "#,
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn active_tour_plan(&self, employee_id: u64, date: NaiveDate) -> Result<Option<TourPlan>> {
        Ok(sqlx::query_as::<_, TourPlan>(
            r#"
            SELECT id, employee_id, work_site_id, from_date, to_date, status, remarks
            FROM tour_plans
            WHERE employee_id = ?
            AND status = 'Active'
            AND from_date <= ?
            AND to_date >= ?
            ORDER BY from_date DESC
            LIMIT 1
            "#,
        )
        .bind(employee_id)
        .bind(date)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn employees_with_pending_punches(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<u64>> {
        let ids = sqlx::query_scalar::<_, u64>(
            r#"
            SELECT employee_id FROM biometric_checkins
            WHERE processed = FALSE AND time BETWEEN ? AND ?
            UNION
            SELECT employee_id FROM mobile_checkins
            WHERE processed = FALSE AND time BETWEEN ? AND ?
            ORDER BY employee_id
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = ids.len(), %from, %to, "Employees with pending punches");
        Ok(ids)
    }

    async fn pending_punches(
        &self,
        employee_id: u64,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<Punch>> {
        self.punches(employee_id, from, to, true).await
    }

    async fn punches_between(
        &self,
        employee_id: u64,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<Punch>> {
        self.punches(employee_id, from, to, false).await
    }

    async fn employees_with_punches_between(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<HashSet<u64>> {
        let ids = sqlx::query_scalar::<_, u64>(
            r#"
            SELECT employee_id FROM biometric_checkins WHERE time BETWEEN ? AND ?
            UNION
            SELECT employee_id FROM mobile_checkins WHERE time BETWEEN ? AND ?
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().collect())
    }

    async fn mark_punches_processed(&self, punches: &[Punch], batch_id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for punch in punches {
            match punch.source {
                PunchSource::Biometric => {
                    sqlx::query("UPDATE biometric_checkins SET processed = TRUE WHERE id = ?")
                        .bind(punch.id)
                        .execute(&mut *tx)
                        .await?;
                }
                PunchSource::Mobile => {
                    sqlx::query(
                        "UPDATE mobile_checkins SET processed = TRUE, processing_batch = ? WHERE id = ?",
                    )
                    .bind(batch_id)
                    .bind(punch.id)
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn insert_mobile_checkin(&self, checkin: NewMobileCheckin) -> Result<MobileCheckin> {
        let result = sqlx::query(
            r#"
            INSERT INTO mobile_checkins
            (employee_id, time, direction, latitude, longitude, gps_accuracy, within_geofence,
             distance_meters, work_site_id, device_fingerprint, fingerprint_risk, ip_address,
             user_agent, processed)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'none', ?, ?, FALSE)
            "#,
        )
        .bind(checkin.employee_id)
        .bind(checkin.time)
        .bind(checkin.direction.to_string())
        .bind(checkin.latitude)
        .bind(checkin.longitude)
        .bind(checkin.gps_accuracy)
        .bind(checkin.within_geofence)
        .bind(checkin.distance_meters)
        .bind(checkin.work_site_id)
        .bind(&checkin.device_fingerprint)
        .bind(&checkin.ip_address)
        .bind(&checkin.user_agent)
        .execute(&self.pool)
        .await?;

        self.mobile_checkin_by_id(result.last_insert_id()).await
    }

    async fn mobile_checkins_between(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<MobileCheckin>> {
        let sql = format!(
            "SELECT {MOBILE_COLUMNS} FROM mobile_checkins WHERE time BETWEEN ? AND ? ORDER BY time"
        );
        Ok(sqlx::query_as::<_, MobileCheckin>(&sql)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn set_fingerprint_risk(&self, checkin_id: u64, risk: RiskFlag) -> Result<()> {
        sqlx::query("UPDATE mobile_checkins SET fingerprint_risk = ? WHERE id = ?")
            .bind(risk.to_string())
            .bind(checkin_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn biometric_punch_exists(
        &self,
        employee_id: u64,
        time: NaiveDateTime,
        direction: Direction,
    ) -> Result<bool> {
        Ok(sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM biometric_checkins
                WHERE employee_id = ? AND time = ? AND direction = ?
            )
            "#,
        )
        .bind(employee_id)
        .bind(time)
        .bind(direction.to_string())
        .fetch_one(&self.pool)
        .await?)
    }

    async fn insert_biometric_checkin(&self, checkin: NewBiometricCheckin) -> Result<BiometricCheckin> {
        let result = sqlx::query(
            r#"
            INSERT INTO biometric_checkins (employee_id, time, direction, device_id, processed)
            VALUES (?, ?, ?, ?, FALSE)
            "#,
        )
        .bind(checkin.employee_id)
        .bind(checkin.time)
        .bind(checkin.direction.to_string())
        .bind(&checkin.device_id)
        .execute(&self.pool)
        .await?;

        Ok(sqlx::query_as::<_, BiometricCheckin>(
            "SELECT id, employee_id, time, direction, device_id, processed FROM biometric_checkins WHERE id = ?",
        )
        .bind(result.last_insert_id())
        .fetch_one(&self.pool)
        .await?)
    }

    async fn find_attendance(&self, employee_id: u64, date: NaiveDate) -> Result<Option<Attendance>> {
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE employee_id = ? AND attendance_date = ?"
        );
        Ok(sqlx::query_as::<_, Attendance>(&sql)
            .bind(employee_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn upsert_attendance(&self, values: &AttendanceUpsert) -> Result<Attendance> {
        sqlx::query(
            r#"
            INSERT INTO attendance
            (employee_id, attendance_date, status, check_in, check_out, working_hours,
             late_entry, early_exit, geofence_violation, fingerprint_anomaly, shift_type_id)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                status = VALUES(status),
                check_in = VALUES(check_in),
                check_out = VALUES(check_out),
                working_hours = VALUES(working_hours),
                late_entry = VALUES(late_entry),
                early_exit = VALUES(early_exit),
                geofence_violation = VALUES(geofence_violation),
                fingerprint_anomaly = VALUES(fingerprint_anomaly),
                shift_type_id = VALUES(shift_type_id)
            "#,
        )
        .bind(values.employee_id)
        .bind(values.attendance_date)
        .bind(values.status.to_string())
        .bind(values.check_in)
        .bind(values.check_out)
        .bind(values.working_hours)
        .bind(values.late_entry)
        .bind(values.early_exit)
        .bind(values.geofence_violation)
        .bind(values.fingerprint_anomaly)
        .bind(values.shift_type_id)
        .execute(&self.pool)
        .await?;

        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE employee_id = ? AND attendance_date = ?"
        );
        Ok(sqlx::query_as::<_, Attendance>(&sql)
            .bind(values.employee_id)
            .bind(values.attendance_date)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn attendance_on(&self, date: NaiveDate) -> Result<Vec<Attendance>> {
        let sql = format!("SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE attendance_date = ?");
        Ok(sqlx::query_as::<_, Attendance>(&sql)
            .bind(date)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn attendance_between(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Attendance>> {
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance \
             WHERE employee_id = ? AND attendance_date BETWEEN ? AND ? \
             ORDER BY attendance_date"
        );
        Ok(sqlx::query_as::<_, Attendance>(&sql)
            .bind(employee_id)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_overtime(&self, attendance_id: u64, update: &OvertimeUpdate) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE attendance
            SET overtime_hours = ?, break_hours = ?, net_working_hours = ?
            WHERE id = ?
            "#,
        )
        .bind(update.overtime_hours)
        .bind(update.break_hours)
        .bind(update.net_working_hours)
        .bind(attendance_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_processor_log(&self, log: &NewProcessorLog) -> Result<ProcessorLog> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance_processor_logs
            (batch_id, run_time, from_date, to_date, run_trigger, status,
             total_processed, error_count, errors)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&log.batch_id)
        .bind(log.run_time)
        .bind(log.from_date)
        .bind(log.to_date)
        .bind(log.run_trigger.to_string())
        .bind(log.status.to_string())
        .bind(log.total_processed)
        .bind(log.error_count)
        .bind(log.errors.join("\n"))
        .execute(&self.pool)
        .await?;

        let sql = format!("SELECT {PROCESSOR_LOG_COLUMNS} FROM attendance_processor_logs WHERE id = ?");
        Ok(sqlx::query_as::<_, ProcessorLog>(&sql)
            .bind(result.last_insert_id())
            .fetch_one(&self.pool)
            .await?)
    }

    async fn recent_processor_logs(&self, limit: u32) -> Result<Vec<ProcessorLog>> {
        let sql = format!(
            "SELECT {PROCESSOR_LOG_COLUMNS} FROM attendance_processor_logs ORDER BY id DESC LIMIT ?"
        );
        Ok(sqlx::query_as::<_, ProcessorLog>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn insert_anomaly_summary(&self, summary: &AnomalySummary) -> Result<AnomalySummary> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance_anomaly_summaries
            (summary_date, generated_at, geofence_violations, fingerprint_anomalies,
             late_entries, early_exits, missing_punches, outside_geofence_checkins, flagged_devices)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(summary.summary_date)
        .bind(summary.generated_at)
        .bind(summary.geofence_violations)
        .bind(summary.fingerprint_anomalies)
        .bind(summary.late_entries)
        .bind(summary.early_exits)
        .bind(summary.missing_punches)
        .bind(summary.outside_geofence_checkins)
        .bind(summary.flagged_devices)
        .execute(&self.pool)
        .await?;

        Ok(AnomalySummary {
            id: result.last_insert_id(),
            ..summary.clone()
        })
    }
}
