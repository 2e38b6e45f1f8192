use crate::api::AppState;
use crate::auth::auth::AuthUser;
use crate::utils::device_probe::{DEFAULT_DEVICE_PORT, ProbeResult, test_device_connection};
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct DeviceTestRequest {
    #[schema(example = "192.168.1.201")]
    pub device_ip: String,
    #[schema(example = 4370)]
    pub device_port: Option<u16>,
}

/// Check that a biometric device answers on its port
#[utoipa::path(
    post,
    path = "/api/devices/test",
    request_body = DeviceTestRequest,
    responses(
        (status = 200, description = "Probe outcome", body = ProbeResult, example = json!({
            "success": false,
            "error": "device unreachable: no answer from device at 192.168.1.201:4370 within 5s"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Biometric"
)]
pub async fn test_device(
    auth: AuthUser,
    state: web::Data<AppState>,
    body: web::Json<DeviceTestRequest>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let port = body.device_port.unwrap_or(DEFAULT_DEVICE_PORT);
    let result = test_device_connection(&body.device_ip, port, state.config.device_timeout()).await;
    Ok(HttpResponse::Ok().json(result))
}
