use crate::api::{AppState, local_now};
use crate::auth::auth::AuthUser;
use crate::engine::checkin::{CheckinRequest, CheckinResponse, ClientInfo, submit_mobile_checkin};
use crate::engine::summary::summarize_date;
use crate::error::AttendanceError;
use crate::jobs::{processing_window, yesterday};
use crate::model::anomaly_summary::AnomalySummary;
use crate::model::processor_log::{ProcessorLog, RunTrigger};
use actix_web::{HttpRequest, HttpResponse, Responder, http::header, web};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

/// Mobile clock-in / clock-out
#[utoipa::path(
    post,
    path = "/api/attendance/mobile-checkin",
    request_body = CheckinRequest,
    responses(
        (status = 200, description = "Punch recorded", body = CheckinResponse, example = json!({
            "status": "ok",
            "checkin_id": 812,
            "within_geofence": true,
            "distance_meters": 14.2,
            "work_site_id": 4
        })),
        (status = 400, description = "Missing or invalid GPS data", body = Object, example = json!({
            "message": "validation failed: GPS coordinates are required"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 429, description = "Too many requests")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn mobile_checkin(
    auth: AuthUser,
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<CheckinRequest>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.employee()?;

    let client = ClientInfo {
        ip: req.connection_info().realip_remote_addr().map(str::to_string),
        user_agent: req
            .headers()
            .get(header::USER_AGENT)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string),
    };

    let response = submit_mobile_checkin(
        state.store.as_ref(),
        employee_id,
        body.into_inner(),
        &client,
        &state.config.checkin_settings(),
        local_now(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(response))
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ProcessRequest {
    #[schema(example = "2025-03-08", format = "date", value_type = Option<String>)]
    pub from_date: Option<NaiveDate>,
    #[schema(example = "2025-03-10", format = "date", value_type = Option<String>)]
    pub to_date: Option<NaiveDate>,
}

/// Run attendance reconciliation now
///
/// Defaults to the same window as the scheduled run.
#[utoipa::path(
    post,
    path = "/api/attendance/process",
    request_body = ProcessRequest,
    responses(
        (status = 200, description = "Run finished; see status and error_count", body = ProcessorLog),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn process_attendance(
    auth: AuthUser,
    state: web::Data<AppState>,
    body: Option<web::Json<ProcessRequest>>,
) -> actix_web::Result<impl Responder> {
    auth.require_job_runner()?;

    let now = local_now();
    let request = body.map(web::Json::into_inner).unwrap_or_default();
    let (from, to) = processing_window(
        request.from_date,
        request.to_date,
        state.config.processing_window_days,
        now,
    );

    info!(user = %auth.username, %from, %to, "Manual attendance processing requested");
    let log = state
        .reconciler
        .process_window(from, to, RunTrigger::Manual, now)
        .await?;

    Ok(HttpResponse::Ok().json(log))
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct DateRequest {
    /// Defaults to yesterday.
    #[schema(example = "2025-03-10", format = "date", value_type = Option<String>)]
    pub date: Option<NaiveDate>,
}

/// Build the anomaly summary for a day
#[utoipa::path(
    post,
    path = "/api/attendance/summary",
    request_body = DateRequest,
    responses(
        (status = 200, description = "Summary stored", body = AnomalySummary),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn anomaly_summary(
    auth: AuthUser,
    state: web::Data<AppState>,
    body: Option<web::Json<DateRequest>>,
) -> actix_web::Result<impl Responder> {
    auth.require_job_runner()?;

    let now = local_now();
    let date = body
        .and_then(|b| b.into_inner().date)
        .unwrap_or_else(|| yesterday(now));
    let summary = summarize_date(state.store.as_ref(), date, now).await?;
    Ok(HttpResponse::Ok().json(summary))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LogQuery {
    /// Most recent first; at most 200.
    pub limit: Option<u32>,
}

/// Recent processor runs
#[utoipa::path(
    get,
    path = "/api/attendance/processor-logs",
    params(LogQuery),
    responses(
        (status = 200, description = "Newest first", body = Vec<ProcessorLog>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn processor_logs(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<LogQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let limit = query.limit.unwrap_or(20);
    if limit == 0 || limit > 200 {
        return Err(AttendanceError::validation("limit must be between 1 and 200").into());
    }
    let logs = state.store.recent_processor_logs(limit).await?;
    Ok(HttpResponse::Ok().json(logs))
}

#[cfg(test)]
mod tests {
    use actix_web::{App, test, web::Data};
    use serde_json::{Value, json};

    use crate::auth::jwt::issue_token;
    use crate::model::punch::Direction;
    use crate::models::TokenType;
    use crate::routes;
    use crate::store::memory::MemoryStore;
    use crate::test_support::{day_shift, employee, test_config, work_site};

    use super::*;

    fn bearer(role: u8, employee_id: Option<u64>) -> (header::HeaderName, String) {
        let token = issue_token(1, role, employee_id, TokenType::Access, "test-secret");
        (header::AUTHORIZATION, format!("Bearer {token}"))
    }

    fn peer() -> std::net::SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    macro_rules! app {
        ($store:expr) => {{
            let config = test_config();
            let state = Data::new(AppState::new($store.clone(), config.clone()));
            test::init_service(
                App::new()
                    .app_data(Data::new(config.clone()))
                    .app_data(state)
                    .configure(|cfg| routes::configure(cfg, &config)),
            )
            .await
        }};
    }

    fn seeded() -> std::sync::Arc<MemoryStore> {
        let store = std::sync::Arc::new(MemoryStore::new());
        store.add_shift_type(day_shift(1));
        store.add_work_site(work_site(1, 6.4281, 3.4219, 150.0));
        let mut emp = employee(5, Some(1));
        emp.default_work_site_id = Some(1);
        store.add_employee(emp);
        store
    }

    #[actix_web::test]
    async fn employee_clocks_in_and_hr_processes() {
        let store = seeded();
        let app = app!(store);

        let req = test::TestRequest::post()
            .uri("/api/attendance/mobile-checkin")
            .peer_addr(peer())
            .insert_header(bearer(3, Some(5)))
            .insert_header((header::USER_AGENT, "okhttp/4.12"))
            .set_json(json!({
                "direction": "IN",
                "latitude": 6.4282,
                "longitude": 3.4220,
                "fingerprint_raw": {"model": "Pixel 7"}
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["within_geofence"], true);
        assert_eq!(body["work_site_id"], 1);
        assert_eq!(store.tables().mobile.len(), 1);

        let req = test::TestRequest::post()
            .uri("/api/attendance/process")
            .peer_addr(peer())
            .insert_header(bearer(2, None))
            .set_json(json!({}))
            .to_request();
        let log: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(log["run_trigger"], "manual");
        // a lone IN punch waits for its pair
        assert_eq!(log["total_processed"], 0);
        assert_eq!(store.tables().processor_logs.len(), 1);
    }

    #[actix_web::test]
    async fn checkin_without_gps_is_bad_request() {
        let store = seeded();
        let app = app!(store);

        let req = test::TestRequest::post()
            .uri("/api/attendance/mobile-checkin")
            .peer_addr(peer())
            .insert_header(bearer(3, Some(5)))
            .set_json(json!({ "direction": "OUT" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["message"].as_str().unwrap().contains("GPS"));
    }

    #[actix_web::test]
    async fn roles_and_tokens_are_enforced() {
        let store = seeded();
        let app = app!(store);

        let req = test::TestRequest::post()
            .uri("/api/attendance/process")
            .peer_addr(peer())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 401);

        let req = test::TestRequest::post()
            .uri("/api/attendance/process")
            .peer_addr(peer())
            .insert_header(bearer(3, Some(5)))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 403);

        let req = test::TestRequest::get()
            .uri("/api/attendance/processor-logs?limit=500")
            .peer_addr(peer())
            .insert_header(bearer(1, None))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400);
        assert!(store.tables().processor_logs.is_empty());
    }

    #[actix_web::test]
    async fn summary_and_logs_for_hr() {
        let store = seeded();
        store.add_biometric(5, crate::test_support::at(2025, 3, 10, 9, 0), Direction::In);
        let app = app!(store);

        let req = test::TestRequest::post()
            .uri("/api/attendance/summary")
            .peer_addr(peer())
            .insert_header(bearer(2, None))
            .set_json(json!({ "date": "2025-03-10" }))
            .to_request();
        let summary: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(summary["summary_date"], "2025-03-10");
        assert_eq!(summary["missing_punches"], 0);

        let req = test::TestRequest::get()
            .uri("/api/attendance/processor-logs")
            .peer_addr(peer())
            .insert_header(bearer(2, None))
            .to_request();
        let logs: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(logs.as_array().unwrap().len(), 0);
    }
}
