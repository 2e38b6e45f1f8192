//! Mobile clock-in: GPS validation, work site resolution, geofence and
//! fingerprint, then persistence. Reconciliation picks the row up later.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};
use utoipa::ToSchema;

use super::fingerprint::fingerprint_hash;
use super::geofence::{self, Boundary, Coordinate, GeofenceResult};
use super::shift::effective_work_site;
use crate::error::{AttendanceError, Result};
use crate::model::{
    employee::Employee, mobile_checkin::NewMobileCheckin, punch::Direction, work_site::WorkSite,
};
use crate::store::AttendanceStore;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CheckinRequest {
    pub direction: Direction,
    #[schema(example = 6.4281)]
    pub latitude: Option<f64>,
    #[schema(example = 3.4219)]
    pub longitude: Option<f64>,
    /// Reported GPS accuracy in meters.
    #[schema(example = 8.5)]
    pub accuracy: Option<f64>,
    /// Device time of the punch; server time when absent.
    #[schema(value_type = Option<String>, example = "2025-03-10T09:02:11")]
    pub timestamp: Option<NaiveDateTime>,
    /// Free-form device attributes, as an object or a JSON string.
    #[schema(value_type = Option<Object>)]
    pub fingerprint_raw: Option<Value>,
}

/// Request metadata that feeds the device fingerprint.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CheckinSettings {
    pub boundary: Boundary,
    /// How far into the future a client timestamp may be.
    pub max_skew: Duration,
}

impl Default for CheckinSettings {
    fn default() -> Self {
        Self {
            boundary: Boundary::Inclusive,
            max_skew: Duration::seconds(300),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CheckinResponse {
    #[schema(example = "ok")]
    pub status: String,
    pub checkin_id: u64,
    pub within_geofence: bool,
    pub distance_meters: Option<f64>,
    pub work_site_id: Option<u64>,
}

fn parse_raw(raw: Option<Value>) -> Value {
    match raw {
        Some(Value::String(text)) => {
            serde_json::from_str(&text).unwrap_or_else(|_| Value::Object(Map::new()))
        }
        Some(Value::Null) | None => Value::Object(Map::new()),
        Some(other) => other,
    }
}

fn validate(request: &CheckinRequest, now: NaiveDateTime, max_skew: Duration) -> Result<(Coordinate, NaiveDateTime)> {
    let (Some(latitude), Some(longitude)) = (request.latitude, request.longitude) else {
        return Err(AttendanceError::validation("GPS coordinates are required"));
    };
    let point = Coordinate::new(latitude, longitude);
    if !point.is_valid() {
        return Err(AttendanceError::validation("invalid latitude/longitude"));
    }
    if let Some(accuracy) = request.accuracy {
        if !accuracy.is_finite() || accuracy < 0.0 {
            return Err(AttendanceError::validation("invalid GPS accuracy"));
        }
    }

    let time = request.timestamp.unwrap_or(now);
    if time > now + max_skew {
        return Err(AttendanceError::validation("timestamp is in the future"));
    }
    Ok((point, time))
}

async fn resolve_site(
    store: &dyn AttendanceStore,
    employee: &Employee,
    point: Coordinate,
    time: NaiveDateTime,
) -> Result<Option<WorkSite>> {
    if let Some(site) = effective_work_site(store, employee, time.date()).await? {
        return Ok(Some(site));
    }
    let sites = store.active_work_sites().await?;
    Ok(geofence::nearest_site(point, &sites).cloned())
}

pub async fn submit_mobile_checkin(
    store: &dyn AttendanceStore,
    employee_id: u64,
    request: CheckinRequest,
    client: &ClientInfo,
    settings: &CheckinSettings,
    now: NaiveDateTime,
) -> Result<CheckinResponse> {
    let (point, time) = validate(&request, now, settings.max_skew)?;

    let employee = store
        .find_employee(employee_id)
        .await?
        .ok_or_else(|| AttendanceError::NotFound(format!("employee {employee_id}")))?;
    if !employee.is_active() {
        return Err(AttendanceError::validation(format!(
            "employee {employee_id} is {}",
            employee.status
        )));
    }

    let site = resolve_site(store, &employee, point, time).await?;
    let fence = match &site {
        Some(site) => geofence::evaluate(Some(point), site, settings.boundary),
        None => {
            debug!(employee_id, "No work site to check against");
            GeofenceResult::OUTSIDE
        }
    };

    let ip = client.ip.clone().unwrap_or_default();
    let user_agent = client.user_agent.clone().unwrap_or_default();
    let fingerprint = fingerprint_hash(&parse_raw(request.fingerprint_raw), &ip, &user_agent);

    let saved = store
        .insert_mobile_checkin(NewMobileCheckin {
            employee_id,
            time,
            direction: request.direction,
            latitude: point.latitude,
            longitude: point.longitude,
            gps_accuracy: request.accuracy,
            within_geofence: fence.within_geofence,
            distance_meters: fence.finite_distance(),
            work_site_id: site.as_ref().map(|s| s.id),
            device_fingerprint: fingerprint,
            ip_address: client.ip.clone(),
            user_agent: client.user_agent.clone(),
        })
        .await?;

    info!(
        checkin_id = saved.id,
        employee_id,
        direction = %saved.direction,
        within = saved.within_geofence,
        "Mobile check-in recorded"
    );

    Ok(CheckinResponse {
        status: "ok".into(),
        checkin_id: saved.id,
        within_geofence: saved.within_geofence,
        distance_meters: saved.distance_meters,
        work_site_id: saved.work_site_id,
    })
}
