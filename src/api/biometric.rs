use crate::api::AppState;
use crate::auth::auth::AuthUser;
use crate::engine::intake::{DeviceBatch, IntakeReport, ingest_device_logs};
use actix_web::{HttpResponse, Responder, web};

/// Forward raw logs read from a biometric device
///
/// Unknown or inactive device users are reported in `errors`; punches
/// already stored are skipped.
#[utoipa::path(
    post,
    path = "/api/biometric/punches",
    request_body = DeviceBatch,
    responses(
        (status = 200, description = "Batch ingested", body = IntakeReport, example = json!({
            "success": true,
            "synced": 41,
            "skipped": 3,
            "total_logs": 45,
            "errors": ["log 12: employee for device user 9001 not found"]
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Biometric"
)]
pub async fn push_punches(
    auth: AuthUser,
    state: web::Data<AppState>,
    body: web::Json<DeviceBatch>,
) -> actix_web::Result<impl Responder> {
    auth.require_device_pusher()?;

    let report = ingest_device_logs(state.store.as_ref(), &body).await;
    Ok(HttpResponse::Ok().json(report))
}
