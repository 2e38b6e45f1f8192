use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::error::AttendanceError;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[strum(ascii_case_insensitive)]
pub enum TourPlanStatus {
    Draft,
    Active,
    Completed,
    Cancelled,
}

impl TourPlanStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TourPlanStatus::Completed | TourPlanStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: TourPlanStatus) -> bool {
        use TourPlanStatus::*;
        matches!(
            (self, next),
            (Draft, Active) | (Draft, Cancelled) | (Active, Completed) | (Active, Cancelled)
        )
    }
}

/// Temporary reassignment of an employee to another work site.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct TourPlan {
    pub id: u64,
    pub employee_id: u64,
    pub work_site_id: u64,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    #[sqlx(try_from = "String")]
    pub status: TourPlanStatus,
    pub remarks: Option<String>,
}

impl TourPlan {
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.from_date <= date && date <= self.to_date
    }

    pub fn overlaps(&self, other: &TourPlan) -> bool {
        self.from_date <= other.to_date && other.from_date <= self.to_date
    }

    /// Checks the date range and that no other active plan of the same
    /// employee overlaps this one once it is active.
    pub fn validate(&self, others: &[TourPlan]) -> Result<(), AttendanceError> {
        if self.from_date > self.to_date {
            return Err(AttendanceError::validation(format!(
                "tour plan {}: from_date {} is after to_date {}",
                self.id, self.from_date, self.to_date
            )));
        }
        if self.status != TourPlanStatus::Active {
            return Ok(());
        }
        let clash = others.iter().find(|other| {
            other.id != self.id
                && other.employee_id == self.employee_id
                && other.status == TourPlanStatus::Active
                && self.overlaps(other)
        });
        match clash {
            Some(other) => Err(AttendanceError::validation(format!(
                "tour plan {} overlaps active tour plan {} for employee {}",
                self.id, other.id, self.employee_id
            ))),
            None => Ok(()),
        }
    }

    pub fn transition(&mut self, next: TourPlanStatus) -> Result<(), AttendanceError> {
        if !self.status.can_transition_to(next) {
            return Err(AttendanceError::validation(format!(
                "tour plan {} cannot move from {} to {}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }
}
