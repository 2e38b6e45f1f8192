//! Intake of raw biometric device logs forwarded by the device connector.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::error::{AttendanceError, Result};
use crate::model::{biometric_checkin::NewBiometricCheckin, punch::Direction};
use crate::store::AttendanceStore;

/// One attendance record as read from a device.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DeviceLog {
    /// User id enrolled on the device.
    #[schema(example = "1007")]
    pub user_id: String,
    #[schema(value_type = String, example = "2025-03-10T09:02:11")]
    pub timestamp: NaiveDateTime,
    /// Device status code, see [`Direction::from_device_status`].
    #[schema(example = 0)]
    pub status: i32,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DeviceBatch {
    #[schema(example = "192.168.1.201")]
    pub device_id: String,
    pub logs: Vec<DeviceLog>,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct IntakeReport {
    pub success: bool,
    pub synced: u32,
    pub skipped: u32,
    pub total_logs: usize,
    pub errors: Vec<String>,
}

enum LogOutcome {
    Synced,
    Duplicate,
}

async fn ingest_one(
    store: &dyn AttendanceStore,
    device_id: &str,
    log: &DeviceLog,
) -> Result<LogOutcome> {
    let employee = store
        .find_employee_by_device_id(log.user_id.trim())
        .await?
        .ok_or_else(|| AttendanceError::NotFound(format!("employee for device user {}", log.user_id)))?;

    if !employee.is_active() {
        return Err(AttendanceError::validation(format!(
            "rejected punch from {} employee {} (device user {})",
            employee.status,
            employee.full_name(),
            log.user_id
        )));
    }

    let direction = Direction::from_device_status(log.status);
    if store
        .biometric_punch_exists(employee.id, log.timestamp, direction)
        .await?
    {
        return Ok(LogOutcome::Duplicate);
    }

    store
        .insert_biometric_checkin(NewBiometricCheckin {
            employee_id: employee.id,
            time: log.timestamp,
            direction,
            device_id: Some(device_id.to_string()),
        })
        .await?;
    Ok(LogOutcome::Synced)
}

/// Stores new punches from a device batch. Bad logs are reported and
/// skipped; the rest of the batch still goes in.
pub async fn ingest_device_logs(store: &dyn AttendanceStore, batch: &DeviceBatch) -> IntakeReport {
    let mut report = IntakeReport {
        success: true,
        total_logs: batch.logs.len(),
        ..IntakeReport::default()
    };

    for (index, log) in batch.logs.iter().enumerate() {
        match ingest_one(store, &batch.device_id, log).await {
            Ok(LogOutcome::Synced) => report.synced += 1,
            Ok(LogOutcome::Duplicate) => report.skipped += 1,
            Err(e) => {
                if !e.is_isolated() {
                    report.success = false;
                }
                warn!(error = %e, index, device_id = %batch.device_id, "Device log rejected");
                report.errors.push(format!("log {index}: {e}"));
            }
        }
    }

    info!(
        device_id = %batch.device_id,
        synced = report.synced,
        skipped = report.skipped,
        errors = report.errors.len(),
        "Device logs ingested"
    );
    report
}
