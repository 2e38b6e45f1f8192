use crate::api::attendance::{DateRequest, ProcessRequest};
use crate::api::device::DeviceTestRequest;
use crate::engine::checkin::{CheckinRequest, CheckinResponse};
use crate::engine::intake::{DeviceBatch, DeviceLog, IntakeReport};
use crate::engine::overtime::{OvertimeDay, OvertimeRunReport, OvertimeSummary};
use crate::model::anomaly_summary::AnomalySummary;
use crate::model::mobile_checkin::RiskFlag;
use crate::model::processor_log::{ProcessorLog, RunStatus, RunTrigger};
use crate::model::punch::Direction;
use crate::utils::device_probe::ProbeResult;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM Attendance API",
        version = "1.0.0",
        description = r#"
## Advanced Attendance

Attendance add-on for the HRM system: biometric punches and GPS-validated
mobile clock-ins are reconciled into one attendance record per employee per day.

### Key Features
- **Mobile clock-in** with geofence checks against the assigned or nearest work site
- **Device fingerprinting** flagging shared and high-frequency devices
- **Hourly reconciliation** with an audit log for every run
- **Daily anomaly summary** and **overtime / break time** calculation
- **Biometric intake** for logs forwarded by the device connector

### Security
Every endpoint requires a **JWT Bearer** access token issued by the HRM auth service.
Batch operations are limited to **HR**, **Admin** and **System** roles.
"#,
    ),
    paths(
        crate::api::attendance::mobile_checkin,
        crate::api::attendance::process_attendance,
        crate::api::attendance::anomaly_summary,
        crate::api::attendance::processor_logs,

        crate::api::overtime::process_overtime,
        crate::api::overtime::get_overtime_summary,

        crate::api::biometric::push_punches,
        crate::api::device::test_device
    ),
    components(
        schemas(
            CheckinRequest,
            CheckinResponse,
            Direction,
            RiskFlag,
            ProcessRequest,
            DateRequest,
            ProcessorLog,
            RunStatus,
            RunTrigger,
            AnomalySummary,
            OvertimeRunReport,
            OvertimeSummary,
            OvertimeDay,
            DeviceBatch,
            DeviceLog,
            IntakeReport,
            DeviceTestRequest,
            ProbeResult
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Clock-in, reconciliation and anomaly APIs"),
        (name = "Overtime", description = "Overtime and break time APIs"),
        (name = "Biometric", description = "Biometric device APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
