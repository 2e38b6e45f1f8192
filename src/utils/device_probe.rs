//! TCP reachability check for biometric devices. Only proves the port
//! accepts connections; the vendor protocol is spoken by the connector.

use std::time::Duration;

use serde::Serialize;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::error::AttendanceError;

pub const DEFAULT_DEVICE_PORT: u16 = 4370;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProbeResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProbeResult {
    fn reachable(message: String) -> Self {
        Self {
            success: true,
            message: Some(message),
            error: None,
        }
    }

    fn unreachable(error: &AttendanceError) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.to_string()),
        }
    }
}

async fn connect(ip: &str, port: u16, limit: Duration) -> Result<(), AttendanceError> {
    let target = format!("{ip}:{port}");
    match timeout(limit, TcpStream::connect(target.as_str())).await {
        Ok(Ok(_stream)) => Ok(()),
        Ok(Err(e)) => Err(AttendanceError::Connectivity(format!(
            "unable to connect to device at {target}: {e}"
        ))),
        Err(_) => Err(AttendanceError::Connectivity(format!(
            "no answer from device at {target} within {}s",
            limit.as_secs()
        ))),
    }
}

/// Never fails; the outcome is reported in the result.
pub async fn test_device_connection(ip: &str, port: u16, limit: Duration) -> ProbeResult {
    if ip.trim().is_empty() {
        return ProbeResult::unreachable(&AttendanceError::validation("device_ip is required"));
    }

    match connect(ip.trim(), port, limit).await {
        Ok(()) => {
            info!(ip, port, "Device reachable");
            ProbeResult::reachable(format!("Successfully connected to device at {ip}:{port}"))
        }
        Err(e) => {
            warn!(error = %e, ip, port, "Device connection test failed");
            ProbeResult::unreachable(&e)
        }
    }
}
