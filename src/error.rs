use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AttendanceError>;

#[derive(Error, Debug)]
pub enum AttendanceError {
    /// Bad input: missing GPS, malformed coordinates, invalid ranges.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("no shift resolvable for employee {employee_id} on {date}")]
    MissingShift {
        employee_id: u64,
        date: chrono::NaiveDate,
    },

    #[error("{0} not found")]
    NotFound(String),

    #[error("device unreachable: {0}")]
    Connectivity(String),

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}

impl AttendanceError {
    pub fn validation(message: impl Into<String>) -> Self {
        AttendanceError::Validation(message.into())
    }

    /// Errors that are counted against a single employee/day and do not
    /// stop a batch.
    pub fn is_isolated(&self) -> bool {
        !matches!(self, AttendanceError::Store(_))
    }
}

impl ResponseError for AttendanceError {
    fn status_code(&self) -> StatusCode {
        match self {
            AttendanceError::Validation(_) | AttendanceError::MissingShift { .. } => {
                StatusCode::BAD_REQUEST
            }
            AttendanceError::NotFound(_) => StatusCode::NOT_FOUND,
            AttendanceError::Connectivity(_) => StatusCode::BAD_GATEWAY,
            AttendanceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AttendanceError::Store(e) => {
                tracing::error!(error = %e, "Store error");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(json!({ "message": message }))
    }
}
