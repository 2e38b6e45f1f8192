use std::sync::Arc;

use chrono::{Local, NaiveDateTime};

use crate::config::Config;
use crate::engine::reconcile::Reconciler;
use crate::store::SharedStore;

pub mod attendance;
pub mod biometric;
pub mod device;
pub mod overtime;

/// Shared handler state. `Config` is registered separately as well since
/// the auth middleware reads it on its own.
pub struct AppState {
    pub store: SharedStore,
    pub reconciler: Arc<Reconciler>,
    pub config: Config,
}

impl AppState {
    pub fn new(store: SharedStore, config: Config) -> Self {
        let reconciler = Arc::new(Reconciler::new(store.clone(), config.reconcile_settings()));
        Self {
            store,
            reconciler,
            config,
        }
    }
}

/// Server-local wall clock; punches and shifts are stored as naive local time.
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}
