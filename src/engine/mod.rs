pub mod checkin;
pub mod fingerprint;
pub mod geofence;
pub mod intake;
pub mod overtime;
pub mod reconcile;
pub mod shift;
pub mod summary;
