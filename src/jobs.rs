//! Entry points for the host scheduler. Nothing here keeps its own timer;
//! the CLI subcommands and the HTTP API call these.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use tracing::info;

use crate::engine::overtime::{self, OvertimeRunReport};
use crate::engine::reconcile::Reconciler;
use crate::engine::summary;
use crate::error::Result;
use crate::model::{
    anomaly_summary::AnomalySummary,
    processor_log::{ProcessorLog, RunTrigger},
};
use crate::store::AttendanceStore;

pub fn yesterday(now: NaiveDateTime) -> NaiveDate {
    now.date() - Duration::days(1)
}

/// Fills in a reconciliation window: `to` defaults to today and `from` to
/// `window_days` before `to`.
pub fn processing_window(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    window_days: u32,
    now: NaiveDateTime,
) -> (NaiveDate, NaiveDate) {
    let to = to.unwrap_or(now.date());
    let from = from.unwrap_or(to - Duration::days(i64::from(window_days)));
    (from, to)
}

/// Reconciles `today - window_days ..= today`.
pub async fn hourly_reconciliation(
    reconciler: &Reconciler,
    window_days: u32,
    now: NaiveDateTime,
) -> Result<ProcessorLog> {
    let (from, to) = processing_window(None, None, window_days, now);
    info!(%from, %to, "Scheduled attendance processing");
    reconciler
        .process_window(from, to, RunTrigger::Scheduled, now)
        .await
}

pub async fn daily_anomaly_snapshot(
    store: &dyn AttendanceStore,
    now: NaiveDateTime,
) -> Result<AnomalySummary> {
    summary::summarize_date(store, yesterday(now), now).await
}

pub async fn daily_overtime(
    store: &dyn AttendanceStore,
    now: NaiveDateTime,
) -> Result<OvertimeRunReport> {
    overtime::process_overtime_for_date(store, yesterday(now)).await
}
