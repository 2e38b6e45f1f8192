//! Punch reconciliation: turns the raw biometric and mobile punches of a
//! window into one attendance row per employee per day.
//!
//! A day moves NoPunches -> Partial -> Complete -> Finalized. Partial days
//! leave their punches unprocessed so a later run can pair them; finalized
//! days are upserted on `(employee_id, attendance_date)`, which keeps
//! re-runs idempotent.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::fingerprint;
use super::shift::effective_shift;
use crate::error::{AttendanceError, Result};
use crate::model::{
    attendance::{Attendance, AttendanceStatus, AttendanceUpsert},
    employee::Employee,
    mobile_checkin::RiskFlag,
    processor_log::{NewProcessorLog, ProcessorLog, RunStatus, RunTrigger},
    punch::Punch,
    shift_type::ShiftType,
};
use crate::store::SharedStore;

#[derive(Debug, Clone)]
pub struct ReconcileSettings {
    /// Same-direction punches closer than this collapse into one.
    pub dedupe_threshold: Duration,
    /// How far back from the end of the run fingerprints are compared.
    pub fingerprint_window: Duration,
    pub high_frequency_threshold: usize,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            dedupe_threshold: Duration::seconds(60),
            fingerprint_window: Duration::hours(24),
            high_frequency_threshold: 12,
        }
    }
}

/// Result of looking at one employee/day.
#[derive(Debug, Clone, PartialEq)]
pub enum DayState {
    NoPunches,
    /// Only one usable punch and nothing to pair it with yet.
    Partial,
    Complete(AttendanceUpsert),
}

pub fn day_start(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

pub fn day_end(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(23, 59, 59).unwrap_or_else(|| day_start(date))
}

/// Ascending by time; `In` before `Out` on equal timestamps.
pub fn sort_punches(punches: &mut [Punch]) {
    punches.sort_by(|a, b| {
        a.time
            .cmp(&b.time)
            .then(a.direction.cmp(&b.direction))
            .then(a.id.cmp(&b.id))
    });
}

/// Drops a punch that repeats the previous kept punch's direction within
/// `threshold`. Expects sorted input.
pub fn deduplicate(punches: &[Punch], threshold: Duration) -> Vec<Punch> {
    let mut kept: Vec<Punch> = Vec::with_capacity(punches.len());
    for punch in punches {
        if let Some(last) = kept.last() {
            if last.direction == punch.direction && punch.time - last.time <= threshold {
                continue;
            }
        }
        kept.push(punch.clone());
    }
    kept
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Pairs first-in/last-out for a day and applies the shift rules. New
/// punches widen an existing attendance rather than replace it.
pub fn evaluate_day(
    employee_id: u64,
    date: NaiveDate,
    punches: &[Punch],
    shift: &ShiftType,
    existing: Option<&Attendance>,
) -> DayState {
    let (Some(first), Some(last)) = (punches.first(), punches.last()) else {
        return DayState::NoPunches;
    };

    let existing_in = existing.and_then(|a| a.check_in);
    let existing_out = existing.and_then(|a| a.check_out);

    if punches.len() < 2 && existing_in.is_none() && existing_out.is_none() {
        return DayState::Partial;
    }

    let check_in = existing_in.map_or(first.time, |t| t.min(first.time));
    let check_out = existing_out.map_or(last.time, |t| t.max(last.time));

    let worked = (check_out - check_in).num_seconds().max(0) as f64 / 3600.0;
    let working_hours = round2(worked);

    let late_entry = check_in > shift.start_on(date) + shift.grace();
    let early_exit = check_out < shift.end_on(date) - shift.grace();

    let geofence_violation = punches.iter().any(Punch::is_outside_geofence)
        || existing.is_some_and(|a| a.geofence_violation);
    let fingerprint_anomaly = punches.iter().any(Punch::has_fingerprint_risk)
        || existing.is_some_and(|a| a.fingerprint_anomaly);

    let status = if working_hours < shift.min_working_hours {
        AttendanceStatus::HalfDay
    } else {
        AttendanceStatus::Present
    };

    DayState::Complete(AttendanceUpsert {
        employee_id,
        attendance_date: date,
        status,
        check_in,
        check_out,
        working_hours,
        late_entry,
        early_exit,
        geofence_violation,
        fingerprint_anomaly,
        shift_type_id: shift.id,
    })
}

/// Clears the running flag when a run ends, however it ends.
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Debug, Default)]
struct RunTally {
    processed: u32,
    errors: Vec<String>,
}

pub struct Reconciler {
    store: SharedStore,
    settings: ReconcileSettings,
    running: AtomicBool,
}

impl Reconciler {
    pub fn new(store: SharedStore, settings: ReconcileSettings) -> Self {
        Self {
            store,
            settings,
            running: AtomicBool::new(false),
        }
    }

    /// Processes every unprocessed punch dated `from..=to` and appends one
    /// processor log entry. Per-employee problems are counted in the log;
    /// a store failure aborts the run as `failed`. Only a failure to write
    /// the log itself is returned as an error.
    #[instrument(name = "process_window", skip(self, now))]
    pub async fn process_window(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        trigger: RunTrigger,
        now: NaiveDateTime,
    ) -> Result<ProcessorLog> {
        let batch_id = Uuid::new_v4().to_string();
        let mut tally = RunTally::default();

        let status = match RunGuard::acquire(&self.running) {
            None => {
                warn!(%batch_id, "Another attendance run is in progress, skipping");
                RunStatus::Skipped
            }
            Some(_guard) if from > to => {
                tally.errors.push(format!("invalid window: {from} is after {to}"));
                RunStatus::Failed
            }
            Some(_guard) => {
                info!(%batch_id, "Attendance processing started");
                match self.run(from, to, now, &batch_id, &mut tally).await {
                    Ok(()) if tally.errors.is_empty() => RunStatus::Success,
                    Ok(()) => RunStatus::Partial,
                    Err(e) => {
                        error!(error = %e, %batch_id, "Attendance processing aborted");
                        tally.errors.push(format!("run aborted: {e}"));
                        RunStatus::Failed
                    }
                }
            }
        };

        let log = NewProcessorLog {
            batch_id,
            run_time: now,
            from_date: from,
            to_date: to,
            run_trigger: trigger,
            status,
            total_processed: tally.processed,
            error_count: tally.errors.len() as u32,
            errors: tally.errors,
        };
        let saved = self.store.insert_processor_log(&log).await?;

        info!(
            batch_id = %saved.batch_id,
            status = %saved.status,
            total = saved.total_processed,
            errors = saved.error_count,
            "Attendance processing finished"
        );
        Ok(saved)
    }

    async fn run(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        now: NaiveDateTime,
        batch_id: &str,
        tally: &mut RunTally,
    ) -> Result<()> {
        let start = day_start(from);
        let end = day_end(to);

        match self.flag_fingerprints(end.min(now)).await {
            Err(e) if !e.is_isolated() => return Err(e),
            Err(e) => {
                warn!(error = %e, "Fingerprint analysis failed");
                tally.errors.push(format!("fingerprint analysis: {e}"));
            }
            Ok(()) => {}
        }

        let employees = self.store.employees_with_pending_punches(start, end).await?;
        debug!(count = employees.len(), "Employees with pending punches");

        for employee_id in employees {
            match self
                .process_employee(employee_id, start, end, batch_id, tally)
                .await
            {
                Err(e) if !e.is_isolated() => return Err(e),
                Err(e) => {
                    warn!(error = %e, employee_id, "Attendance processing failed for employee");
                    tally.errors.push(format!("employee {employee_id}: {e}"));
                }
                Ok(()) => {}
            }
        }
        Ok(())
    }

    async fn process_employee(
        &self,
        employee_id: u64,
        start: NaiveDateTime,
        end: NaiveDateTime,
        batch_id: &str,
        tally: &mut RunTally,
    ) -> Result<()> {
        let employee = self
            .store
            .find_employee(employee_id)
            .await?
            .ok_or_else(|| AttendanceError::NotFound(format!("employee {employee_id}")))?;

        let mut by_day: BTreeMap<NaiveDate, Vec<Punch>> = BTreeMap::new();
        for punch in self.store.pending_punches(employee_id, start, end).await? {
            by_day.entry(punch.time.date()).or_default().push(punch);
        }

        for (date, mut punches) in by_day {
            sort_punches(&mut punches);

            match self.process_day(&employee, date, &punches, batch_id).await {
                Ok(DayState::Complete(_)) => tally.processed += 1,
                Ok(DayState::Partial) => {
                    debug!(employee_id, %date, "Day has unpaired punches, waiting for more");
                }
                Ok(DayState::NoPunches) => {}
                Err(e) if !e.is_isolated() => return Err(e),
                Err(e) => {
                    warn!(error = %e, employee_id, %date, "Skipping employee day");
                    tally.errors.push(format!("employee {employee_id} on {date}: {e}"));
                }
            }
        }
        Ok(())
    }

    async fn process_day(
        &self,
        employee: &Employee,
        date: NaiveDate,
        punches: &[Punch],
        batch_id: &str,
    ) -> Result<DayState> {
        let employee_id = employee.id;
        let shift = effective_shift(self.store.as_ref(), employee, date)
            .await?
            .ok_or(AttendanceError::MissingShift { employee_id, date })?;

        let kept = deduplicate(punches, self.settings.dedupe_threshold);
        let existing = self.store.find_attendance(employee_id, date).await?;

        let state = evaluate_day(employee_id, date, &kept, &shift, existing.as_ref());
        if let DayState::Complete(values) = &state {
            self.store.upsert_attendance(values).await?;
            // duplicates are consumed too, so they are not seen again
            self.store.mark_punches_processed(punches, batch_id).await?;
            debug!(
                employee_id,
                %date,
                working_hours = values.working_hours,
                late = values.late_entry,
                early = values.early_exit,
                "Attendance finalized"
            );
        }
        Ok(state)
    }

    /// Raises the risk flag of mobile check-ins in the fingerprint window
    /// that ends at `until`.
    async fn flag_fingerprints(&self, until: NaiveDateTime) -> Result<()> {
        let since = until
            .checked_sub_signed(self.settings.fingerprint_window)
            .ok_or_else(|| AttendanceError::validation("fingerprint window out of range"))?;
        let checkins = self.store.mobile_checkins_between(since, until).await?;
        let stored: HashMap<u64, RiskFlag> =
            checkins.iter().map(|c| (c.id, c.fingerprint_risk)).collect();

        let mut raised = 0usize;
        for (id, risk) in fingerprint::analyze(&checkins, self.settings.high_frequency_threshold) {
            let current = stored.get(&id).copied().unwrap_or_default();
            if let Some(flag) = fingerprint::escalate(current, risk) {
                self.store.set_fingerprint_risk(id, flag).await?;
                raised += 1;
            }
        }
        if raised > 0 {
            info!(raised, %since, %until, "Fingerprint risk flags raised");
        }
        Ok(())
    }
}
