//! Overtime, break time and net working hours for finalized attendance.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use super::reconcile::{day_end, day_start, round2, sort_punches};
use crate::error::{AttendanceError, Result};
use crate::model::{
    attendance::{Attendance, AttendanceStatus, OvertimeUpdate},
    punch::{Direction, Punch},
    shift_type::ShiftType,
};
use crate::store::AttendanceStore;

fn hours_between(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    (to - from).num_seconds() as f64 / 3600.0
}

/// Hours worked past the shift length, after the shift's threshold and
/// multiplier. Zero when either end of the day is missing.
pub fn overtime_hours(attendance: &Attendance, shift: &ShiftType) -> f64 {
    let (Some(check_in), Some(check_out)) = (attendance.check_in, attendance.check_out) else {
        return 0.0;
    };

    let mut overtime = (hours_between(check_in, check_out) - shift.length_hours()).max(0.0);
    if let Some(threshold) = shift.overtime_threshold_hours.filter(|t| *t > 0.0) {
        overtime = (overtime - threshold).max(0.0);
    }
    if let Some(multiplier) = shift.overtime_multiplier.filter(|m| *m > 0.0) {
        overtime *= multiplier;
    }
    round2(overtime)
}

/// Sum of the OUT -> next IN gaps of a day. Expects sorted punches.
pub fn break_hours(punches: &[Punch]) -> f64 {
    if punches.len() < 2 {
        return 0.0;
    }

    let mut total = 0.0;
    let mut break_start: Option<NaiveDateTime> = None;
    for punch in punches {
        match (punch.direction, break_start) {
            (Direction::Out, None) => break_start = Some(punch.time),
            (Direction::In, Some(start)) => {
                total += hours_between(start, punch.time);
                break_start = None;
            }
            _ => {}
        }
    }
    round2(total)
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OvertimeRunReport {
    pub date: NaiveDate,
    pub processed: u32,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct OvertimeDay {
    pub date: NaiveDate,
    pub overtime_hours: f64,
    pub break_hours: f64,
    pub shift_type_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OvertimeSummary {
    pub employee_id: u64,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub total_overtime_hours: f64,
    pub total_break_hours: f64,
    pub overtime_days_count: usize,
    pub overtime_days: Vec<OvertimeDay>,
}

async fn day_punches(
    store: &dyn AttendanceStore,
    employee_id: u64,
    date: NaiveDate,
) -> Result<Vec<Punch>> {
    let mut punches = store
        .punches_between(employee_id, day_start(date), day_end(date))
        .await?;
    sort_punches(&mut punches);
    Ok(punches)
}

async fn assess(store: &dyn AttendanceStore, attendance: &Attendance) -> Result<OvertimeUpdate> {
    let overtime = match attendance.shift_type_id {
        Some(id) => match store.find_shift_type(id).await? {
            Some(shift) => overtime_hours(attendance, &shift),
            None => return Err(AttendanceError::NotFound(format!("shift type {id}"))),
        },
        None => 0.0,
    };
    let punches = day_punches(store, attendance.employee_id, attendance.attendance_date).await?;
    let breaks = break_hours(&punches);

    Ok(OvertimeUpdate {
        overtime_hours: overtime,
        break_hours: breaks,
        net_working_hours: round2((attendance.working_hours - breaks).max(0.0)),
    })
}

/// Writes overtime, break and net hours on every present attendance of
/// `date`. A failing record is counted and the rest continue.
#[instrument(skip(store))]
pub async fn process_overtime_for_date(
    store: &dyn AttendanceStore,
    date: NaiveDate,
) -> Result<OvertimeRunReport> {
    let mut report = OvertimeRunReport {
        date,
        processed: 0,
        errors: Vec::new(),
    };

    let present = store
        .attendance_on(date)
        .await?
        .into_iter()
        .filter(|a| a.status == AttendanceStatus::Present);

    for attendance in present {
        let outcome = match assess(store, &attendance).await {
            Ok(update) => store.update_overtime(attendance.id, &update).await,
            Err(e) => Err(e),
        };
        match outcome {
            Ok(()) => report.processed += 1,
            Err(e) => {
                warn!(error = %e, attendance_id = attendance.id, "Overtime update failed");
                report.errors.push(format!("attendance {}: {e}", attendance.id));
            }
        }
    }

    info!(
        %date,
        processed = report.processed,
        errors = report.errors.len(),
        "Overtime processed"
    );
    Ok(report)
}

pub async fn overtime_summary(
    store: &dyn AttendanceStore,
    employee_id: u64,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<OvertimeSummary> {
    if from > to {
        return Err(AttendanceError::validation("from_date must not be after to_date"));
    }

    let mut total_overtime = 0.0;
    let mut total_break = 0.0;
    let mut overtime_days = Vec::new();

    for attendance in store.attendance_between(employee_id, from, to).await? {
        if attendance.status != AttendanceStatus::Present {
            continue;
        }
        let update = assess(store, &attendance).await?;
        total_break += update.break_hours;
        if update.overtime_hours > 0.0 {
            total_overtime += update.overtime_hours;
            overtime_days.push(OvertimeDay {
                date: attendance.attendance_date,
                overtime_hours: update.overtime_hours,
                break_hours: update.break_hours,
                shift_type_id: attendance.shift_type_id,
            });
        }
    }

    Ok(OvertimeSummary {
        employee_id,
        from_date: from,
        to_date: to,
        total_overtime_hours: round2(total_overtime),
        total_break_hours: round2(total_break),
        overtime_days_count: overtime_days.len(),
        overtime_days,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::AttendanceUpsert;
    use crate::model::punch::PunchSource;
    use crate::store::memory::MemoryStore;
    use crate::test_support::{at, day, day_shift};

    fn attendance(check_in: Option<NaiveDateTime>, check_out: Option<NaiveDateTime>) -> Attendance {
        Attendance {
            id: 1,
            employee_id: 1,
            attendance_date: day(2025, 3, 10),
            status: AttendanceStatus::Present,
            check_in,
            check_out,
            working_hours: 0.0,
            late_entry: false,
            early_exit: false,
            geofence_violation: false,
            fingerprint_anomaly: false,
            shift_type_id: Some(1),
            overtime_hours: None,
            break_hours: None,
            net_working_hours: None,
        }
    }

    fn punch(h: u32, m: u32, direction: Direction) -> Punch {
        Punch {
            source: PunchSource::Biometric,
            id: 0,
            employee_id: 1,
            time: at(2025, 3, 10, h, m),
            direction,
            within_geofence: None,
            fingerprint_risk: None,
        }
    }

    #[test]
    fn overtime_beyond_shift_length() {
        let att = attendance(Some(at(2025, 3, 10, 9, 0)), Some(at(2025, 3, 10, 20, 30)));
        assert_eq!(overtime_hours(&att, &day_shift(1)), 2.5);

        let mut shift = day_shift(1);
        shift.overtime_threshold_hours = Some(1.0);
        shift.overtime_multiplier = Some(1.5);
        assert_eq!(overtime_hours(&att, &shift), 2.25);

        let short = attendance(Some(at(2025, 3, 10, 9, 0)), Some(at(2025, 3, 10, 17, 0)));
        assert_eq!(overtime_hours(&short, &day_shift(1)), 0.0);
        assert_eq!(overtime_hours(&attendance(Some(at(2025, 3, 10, 9, 0)), None), &day_shift(1)), 0.0);
    }

    #[test]
    fn breaks_are_out_to_in_gaps() {
        let punches = vec![
            punch(9, 0, Direction::In),
            punch(12, 0, Direction::Out),
            punch(12, 45, Direction::In),
            punch(15, 0, Direction::Out),
            punch(15, 15, Direction::In),
            punch(18, 0, Direction::Out),
        ];
        assert_eq!(break_hours(&punches), 1.0);
        assert_eq!(break_hours(&punches[..1]), 0.0);
        // trailing OUT without a return is not a break
        assert_eq!(break_hours(&[punch(9, 0, Direction::In), punch(18, 0, Direction::Out)]), 0.0);
    }

    fn seed(store: &MemoryStore) {
        store.add_shift_type(day_shift(1));
        for (h, m, direction) in [
            (8, 30, Direction::In),
            (13, 0, Direction::Out),
            (13, 30, Direction::In),
            (19, 30, Direction::Out),
        ] {
            store.add_biometric(1, at(2025, 3, 10, h, m), direction);
        }
    }

    async fn finalize(store: &MemoryStore, status: AttendanceStatus, employee_id: u64) -> Attendance {
        store
            .upsert_attendance(&AttendanceUpsert {
                employee_id,
                attendance_date: day(2025, 3, 10),
                status,
                check_in: at(2025, 3, 10, 8, 30),
                check_out: at(2025, 3, 10, 19, 30),
                working_hours: 11.0,
                late_entry: false,
                early_exit: false,
                geofence_violation: false,
                fingerprint_anomaly: false,
                shift_type_id: 1,
            })
            .await
            .unwrap()
    }

    #[actix_web::test]
    async fn daily_job_updates_present_rows_only() {
        let store = MemoryStore::new();
        seed(&store);
        let present = finalize(&store, AttendanceStatus::Present, 1).await;
        let half = finalize(&store, AttendanceStatus::HalfDay, 2).await;

        let report = process_overtime_for_date(&store, day(2025, 3, 10)).await.unwrap();
        assert_eq!(report.processed, 1);
        assert!(report.errors.is_empty());

        let tables = store.tables();
        let row = tables.attendance.iter().find(|a| a.id == present.id).unwrap();
        assert_eq!(row.overtime_hours, Some(2.0));
        assert_eq!(row.break_hours, Some(0.5));
        assert_eq!(row.net_working_hours, Some(10.5));
        let untouched = tables.attendance.iter().find(|a| a.id == half.id).unwrap();
        assert_eq!(untouched.overtime_hours, None);
    }

    #[actix_web::test]
    async fn summary_totals_overtime_days() {
        let store = MemoryStore::new();
        seed(&store);
        finalize(&store, AttendanceStatus::Present, 1).await;

        let summary = overtime_summary(&store, 1, day(2025, 3, 1), day(2025, 3, 31))
            .await
            .unwrap();
        assert_eq!(summary.overtime_days_count, 1);
        assert_eq!(summary.total_overtime_hours, 2.0);
        assert_eq!(summary.total_break_hours, 0.5);
        assert_eq!(summary.overtime_days[0].date, day(2025, 3, 10));

        let inverted = overtime_summary(&store, 1, day(2025, 3, 31), day(2025, 3, 1)).await;
        assert!(matches!(inverted, Err(AttendanceError::Validation(_))));
    }
}
