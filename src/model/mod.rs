pub mod anomaly_summary;
pub mod attendance;
pub mod biometric_checkin;
pub mod employee;
pub mod mobile_checkin;
pub mod processor_log;
pub mod punch;
pub mod role;
pub mod shift_type;
pub mod tour_plan;
pub mod work_site;

/// Lets string-backed enums be read straight out of `VARCHAR` columns
/// with `#[sqlx(try_from = "String")]`.
macro_rules! string_enum_column {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl TryFrom<String> for $ty {
                type Error = strum::ParseError;

                fn try_from(value: String) -> Result<Self, Self::Error> {
                    value.parse()
                }
            }
        )+
    };
}

string_enum_column!(
    punch::Direction,
    mobile_checkin::RiskFlag,
    employee::EmployeeStatus,
    tour_plan::TourPlanStatus,
    attendance::AttendanceStatus,
    processor_log::RunStatus,
    processor_log::RunTrigger,
);
