//! Great-circle distance and geofence membership.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::model::work_site::{WorkSite, valid_coordinate};

pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Whether a punch exactly on the radius counts as inside.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Boundary {
    #[default]
    Inclusive,
    Exclusive,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn is_valid(&self) -> bool {
        valid_coordinate(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeofenceResult {
    pub within_geofence: bool,
    /// `f64::INFINITY` when either end is unusable.
    pub distance_meters: f64,
}

impl GeofenceResult {
    pub const OUTSIDE: GeofenceResult = GeofenceResult {
        within_geofence: false,
        distance_meters: f64::INFINITY,
    };

    /// Distance suitable for storage; infinity becomes `None`.
    pub fn finite_distance(&self) -> Option<f64> {
        self.distance_meters.is_finite().then_some(self.distance_meters)
    }
}

pub fn haversine_meters(a: Coordinate, b: Coordinate) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let d_phi = (b.latitude - a.latitude).to_radians();
    let d_lambda = (b.longitude - a.longitude).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Never fails: a missing or malformed coordinate, or a site that is
/// not usable as a fence, is simply outside.
pub fn evaluate(point: Option<Coordinate>, site: &WorkSite, boundary: Boundary) -> GeofenceResult {
    let Some(point) = point.filter(Coordinate::is_valid) else {
        return GeofenceResult::OUTSIDE;
    };
    if site.validate().is_err() {
        return GeofenceResult::OUTSIDE;
    }

    let distance = haversine_meters(point, Coordinate::new(site.latitude, site.longitude));
    let within = match boundary {
        Boundary::Inclusive => distance <= site.radius,
        Boundary::Exclusive => distance < site.radius,
    };

    GeofenceResult {
        within_geofence: within,
        distance_meters: distance,
    }
}

/// Closest usable site to `point`, used when an employee has no
/// assigned site.
pub fn nearest_site(point: Coordinate, sites: &[WorkSite]) -> Option<&WorkSite> {
    if !point.is_valid() {
        return None;
    }
    sites
        .iter()
        .filter(|site| site.active && site.validate().is_ok())
        .map(|site| (site, haversine_meters(point, Coordinate::new(site.latitude, site.longitude))))
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(site, _)| site)
}
