use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum EmployeeStatus {
    Active,
    Inactive,
    Suspended,
    Left,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "employee_code": "EMP-001",
        "first_name": "John",
        "last_name": "Doe",
        "status": "active",
        "default_shift_type_id": 2,
        "default_work_site_id": 4,
        "attendance_device_id": "1007"
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "EMP-001")]
    pub employee_code: String,

    #[schema(example = "John")]
    pub first_name: String,

    #[schema(example = "Doe")]
    pub last_name: String,

    #[sqlx(try_from = "String")]
    pub status: EmployeeStatus,

    #[schema(example = 2, nullable = true)]
    pub default_shift_type_id: Option<u64>,

    #[schema(example = 4, nullable = true)]
    pub default_work_site_id: Option<u64>,

    /// User id enrolled on the biometric devices.
    #[schema(example = "1007", nullable = true)]
    pub attendance_device_id: Option<String>,
}

impl Employee {
    pub fn is_active(&self) -> bool {
        self.status == EmployeeStatus::Active
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
