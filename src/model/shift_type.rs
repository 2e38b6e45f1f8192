use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ShiftType {
    pub id: u64,
    pub name: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// Minutes tolerated on both ends before late/early flags are raised.
    pub grace_minutes: u32,
    /// Below this the day is recorded as a half day.
    pub min_working_hours: f64,
    pub overtime_threshold_hours: Option<f64>,
    pub overtime_multiplier: Option<f64>,
}

impl ShiftType {
    pub fn grace(&self) -> Duration {
        Duration::minutes(i64::from(self.grace_minutes))
    }

    pub fn start_on(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.start_time)
    }

    /// A shift whose end is not after its start finishes the next day.
    pub fn end_on(&self, date: NaiveDate) -> NaiveDateTime {
        let end = date.and_time(self.end_time);
        if self.end_time <= self.start_time {
            end + Duration::days(1)
        } else {
            end
        }
    }

    pub fn length_hours(&self) -> f64 {
        let today = NaiveDate::MIN;
        (self.end_on(today) - self.start_on(today)).num_seconds() as f64 / 3600.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shift(start: (u32, u32), end: (u32, u32)) -> ShiftType {
        ShiftType {
            id: 1,
            name: "Day".into(),
            start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
            grace_minutes: 10,
            min_working_hours: 4.0,
            overtime_threshold_hours: None,
            overtime_multiplier: None,
        }
    }

    #[test]
    fn day_shift_length() {
        assert_eq!(shift((9, 0), (18, 0)).length_hours(), 9.0);
    }

    #[test]
    fn overnight_shift_ends_next_day() {
        let night = shift((22, 0), (6, 0));
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        assert_eq!(
            night.end_on(date),
            NaiveDate::from_ymd_opt(2025, 3, 11)
                .unwrap()
                .and_hms_opt(6, 0, 0)
                .unwrap()
        );
        assert_eq!(night.length_hours(), 8.0);
    }
}
