//! Fixtures shared by the unit tests.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::model::{
    employee::{Employee, EmployeeStatus},
    mobile_checkin::{MobileCheckin, RiskFlag},
    punch::Direction,
    shift_type::ShiftType,
    work_site::WorkSite,
};

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    day(y, m, d).and_hms_opt(h, min, 0).unwrap()
}

pub fn employee(id: u64, shift_type_id: Option<u64>) -> Employee {
    Employee {
        id,
        employee_code: format!("EMP-{id:03}"),
        first_name: "Ada".into(),
        last_name: format!("Okafor{id}"),
        status: EmployeeStatus::Active,
        default_shift_type_id: shift_type_id,
        default_work_site_id: None,
        attendance_device_id: Some(format!("{}", 1000 + id)),
    }
}

/// 09:00-18:00 with ten minutes of grace.
pub fn day_shift(id: u64) -> ShiftType {
    ShiftType {
        id,
        name: "General".into(),
        start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        grace_minutes: 10,
        min_working_hours: 4.0,
        overtime_threshold_hours: None,
        overtime_multiplier: None,
    }
}

pub fn work_site(id: u64, latitude: f64, longitude: f64, radius: f64) -> WorkSite {
    WorkSite {
        id,
        organization: "Winco".into(),
        name: format!("Site {id}"),
        latitude,
        longitude,
        radius,
        active: true,
        shift_type_id: None,
    }
}

/// Inside-the-fence IN punch; id is left at 0 for the store to assign.
pub fn mobile(employee_id: u64, time: NaiveDateTime, fingerprint: &str) -> MobileCheckin {
    MobileCheckin {
        id: 0,
        employee_id,
        time,
        direction: Direction::In,
        latitude: Some(6.45),
        longitude: Some(3.40),
        gps_accuracy: Some(8.0),
        within_geofence: true,
        distance_meters: Some(12.0),
        work_site_id: Some(1),
        device_fingerprint: Some(fingerprint.to_string()),
        fingerprint_risk: RiskFlag::None,
        ip_address: Some("10.0.0.4".into()),
        user_agent: Some("okhttp/4.12".into()),
        processed: false,
        processing_batch: None,
    }
}

pub fn test_config() -> crate::config::Config {
    crate::config::Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("mysql://localhost/test".to_string()),
        "JWT_SECRET" => Some("test-secret".to_string()),
        _ => None,
    })
    .unwrap()
}
