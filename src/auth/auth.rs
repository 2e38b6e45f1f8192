use crate::error::AttendanceError;
use crate::{auth::jwt::verify_token, config::Config, model::role::Role};
use actix_web::{
    FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorForbidden,
    error::ErrorUnauthorized, web::Data,
};
use futures::future::{Ready, ready};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

fn authenticate(req: &HttpRequest) -> actix_web::Result<AuthUser> {
    // already verified by the middleware
    if let Some(user) = req.extensions().get::<AuthUser>() {
        return Ok(user.clone());
    }

    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| ErrorUnauthorized("Missing token"))?;

    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("Config missing"))?;

    let claims = verify_token(token, &config.jwt_secret).map_err(|_| ErrorUnauthorized("Invalid token"))?;
    let role = Role::from_id(claims.role).ok_or_else(|| ErrorUnauthorized("Invalid role"))?;

    Ok(AuthUser {
        user_id: claims.user_id,
        username: claims.sub,
        role,
        employee_id: claims.employee_id,
    })
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

impl AuthUser {
    pub fn require_hr_or_admin(&self) -> actix_web::Result<()> {
        if matches!(self.role, Role::Admin | Role::Hr) {
            Ok(())
        } else {
            Err(ErrorForbidden("HR/Admin only"))
        }
    }

    pub fn require_job_runner(&self) -> actix_web::Result<()> {
        if self.role.can_run_jobs() {
            Ok(())
        } else {
            Err(ErrorForbidden("HR/Admin/System only"))
        }
    }

    pub fn require_device_pusher(&self) -> actix_web::Result<()> {
        if self.role.can_push_device_logs() {
            Ok(())
        } else {
            Err(ErrorForbidden("Device integrations only"))
        }
    }

    /// The employee behind this login, for self-service endpoints.
    pub fn employee(&self) -> actix_web::Result<u64> {
        self.employee_id
            .ok_or_else(|| AttendanceError::validation("No employee linked to this user").into())
    }

    /// HR and admins may act for anyone; everyone else only for themselves.
    pub fn require_self_or_hr(&self, employee_id: u64) -> actix_web::Result<()> {
        if matches!(self.role, Role::Admin | Role::Hr) || self.employee_id == Some(employee_id) {
            Ok(())
        } else {
            Err(ErrorForbidden("Not allowed for this employee"))
        }
    }
}
