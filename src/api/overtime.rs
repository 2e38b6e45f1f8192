use crate::api::attendance::DateRequest;
use crate::api::{AppState, local_now};
use crate::auth::auth::AuthUser;
use crate::engine::overtime::{
    OvertimeRunReport, OvertimeSummary, overtime_summary, process_overtime_for_date,
};
use crate::jobs::yesterday;
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;

/// Compute overtime, break and net hours for a day
#[utoipa::path(
    post,
    path = "/api/attendance/overtime/process",
    request_body = DateRequest,
    responses(
        (status = 200, description = "Overtime written", body = OvertimeRunReport),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Overtime"
)]
pub async fn process_overtime(
    auth: AuthUser,
    state: web::Data<AppState>,
    body: Option<web::Json<DateRequest>>,
) -> actix_web::Result<impl Responder> {
    auth.require_job_runner()?;

    let date = body
        .and_then(|b| b.into_inner().date)
        .unwrap_or_else(|| yesterday(local_now()));
    let report = process_overtime_for_date(state.store.as_ref(), date).await?;
    Ok(HttpResponse::Ok().json(report))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OvertimeQuery {
    /// Defaults to the caller's own employee record.
    pub employee_id: Option<u64>,
    #[param(example = "2025-03-01", value_type = String, format = Date)]
    pub from_date: NaiveDate,
    #[param(example = "2025-03-31", value_type = String, format = Date)]
    pub to_date: NaiveDate,
}

/// Overtime summary for an employee
#[utoipa::path(
    get,
    path = "/api/attendance/overtime",
    params(OvertimeQuery),
    responses(
        (status = 200, description = "Totals and overtime days", body = OvertimeSummary),
        (status = 400, description = "Invalid date range"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Overtime"
)]
pub async fn get_overtime_summary(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<OvertimeQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = match query.employee_id {
        Some(id) => id,
        None => auth.employee()?,
    };
    auth.require_self_or_hr(employee_id)?;

    let summary = overtime_summary(
        state.store.as_ref(),
        employee_id,
        query.from_date,
        query.to_date,
    )
    .await?;
    Ok(HttpResponse::Ok().json(summary))
}
