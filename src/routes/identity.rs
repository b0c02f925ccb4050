use std::future::{Ready, ready};

use actix_web::dev::Payload;
use actix_web::error::InternalError;
use actix_web::{FromRequest, HttpRequest, HttpResponse};

use super::{ErrorResponse, ErrorResponseWithMessage};

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const USER_ROLE_HEADER: &str = "X-User-Role";

/// The acting user, as asserted by the upstream gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub admin: bool,
}

impl Identity {
    /// `None` when the user may author problems, otherwise the rejection
    pub fn require_admin(&self) -> Option<HttpResponse> {
        if self.admin {
            return None;
        }
        log::info!("User {} denied admin-only operation", self.user_id);
        Some(HttpResponse::Forbidden().json(ErrorResponseWithMessage {
            reason: "ERR_FORBIDDEN",
            code: 8,
            message: "Access denied - Admins only".to_string(),
        }))
    }
}

impl FromRequest for Identity {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let header = |name: &str| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let Some(user_id) = header(USER_ID_HEADER) else {
            let response = HttpResponse::Unauthorized().json(ErrorResponse {
                reason: "ERR_UNAUTHORIZED",
                code: 7,
            });
            return ready(Err(InternalError::from_response("missing user id", response).into()));
        };

        let admin = header(USER_ROLE_HEADER).is_some_and(|role| role.eq_ignore_ascii_case("ADMIN"));

        ready(Ok(Identity {
            user_id: user_id.to_string(),
            admin,
        }))
    }
}
