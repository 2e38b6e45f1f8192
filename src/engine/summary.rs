//! Daily anomaly rollup. Reads attendance and check-ins, writes one
//! summary row.

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{info, instrument};

use super::reconcile::{day_end, day_start};
use super::shift::effective_shift;
use crate::error::Result;
use crate::model::{anomaly_summary::AnomalySummary, mobile_checkin::RiskFlag};
use crate::store::AttendanceStore;

fn count<T>(items: &[T], pred: impl Fn(&T) -> bool) -> u32 {
    items.iter().filter(|&item| pred(item)).count() as u32
}

#[instrument(skip(store, now))]
pub async fn summarize_date(
    store: &dyn AttendanceStore,
    date: NaiveDate,
    now: NaiveDateTime,
) -> Result<AnomalySummary> {
    let (start, end) = (day_start(date), day_end(date));

    let attendance = store.attendance_on(date).await?;
    let checkins = store.mobile_checkins_between(start, end).await?;

    let flagged_devices: HashSet<&str> = checkins
        .iter()
        .filter(|c| c.fingerprint_risk != RiskFlag::None)
        .filter_map(|c| c.device_fingerprint.as_deref())
        .collect();

    let punched = store.employees_with_punches_between(start, end).await?;
    let attended: HashSet<u64> = attendance.iter().map(|a| a.employee_id).collect();
    let mut missing_punches = 0u32;
    for employee in store.active_employees().await? {
        if punched.contains(&employee.id) || attended.contains(&employee.id) {
            continue;
        }
        // nobody is expected in without a shift
        if effective_shift(store, &employee, date).await?.is_some() {
            missing_punches += 1;
        }
    }

    let summary = AnomalySummary {
        id: 0,
        summary_date: date,
        generated_at: now,
        geofence_violations: count(&attendance, |a| a.geofence_violation),
        fingerprint_anomalies: count(&attendance, |a| a.fingerprint_anomaly),
        late_entries: count(&attendance, |a| a.late_entry),
        early_exits: count(&attendance, |a| a.early_exit),
        missing_punches,
        outside_geofence_checkins: count(&checkins, |c| !c.within_geofence),
        flagged_devices: flagged_devices.len() as u32,
    };
    let saved = store.insert_anomaly_summary(&summary).await?;
    if !saved.has_anomalies() {
        info!(%date, "No attendance anomalies");
        return Ok(saved);
    }

    info!(
        %date,
        geofence = saved.geofence_violations,
        fingerprint = saved.fingerprint_anomalies,
        late = saved.late_entries,
        early = saved.early_exits,
        missing = saved.missing_punches,
        "Anomaly summary stored"
    );
    Ok(saved)
}
