//! Effective shift and work site for an employee on a given day.
//!
//! An Active tour plan covering the day wins over the employee's own
//! defaults.

use chrono::NaiveDate;

use crate::error::Result;
use crate::model::{employee::Employee, shift_type::ShiftType, work_site::WorkSite};
use crate::store::AttendanceStore;

pub async fn effective_work_site(
    store: &dyn AttendanceStore,
    employee: &Employee,
    date: NaiveDate,
) -> Result<Option<WorkSite>> {
    if let Some(plan) = store.active_tour_plan(employee.id, date).await? {
        if let Some(site) = store.find_work_site(plan.work_site_id).await? {
            return Ok(Some(site));
        }
    }
    match employee.default_work_site_id {
        Some(id) => store.find_work_site(id).await,
        None => Ok(None),
    }
}

pub async fn effective_shift(
    store: &dyn AttendanceStore,
    employee: &Employee,
    date: NaiveDate,
) -> Result<Option<ShiftType>> {
    if let Some(plan) = store.active_tour_plan(employee.id, date).await? {
        let site_shift = store
            .find_work_site(plan.work_site_id)
            .await?
            .and_then(|site| site.shift_type_id);
        if let Some(shift_id) = site_shift {
            if let Some(shift) = store.find_shift_type(shift_id).await? {
                return Ok(Some(shift));
            }
        }
    }
    match employee.default_shift_type_id {
        Some(id) => store.find_shift_type(id).await,
        None => Ok(None),
    }
}
