mod execute;
mod identity;
mod playlists;
mod problems;
mod submissions;

pub use execute::*;
pub use identity::Identity;
pub use playlists::*;
pub use problems::*;
pub use submissions::*;

use actix_web::error::{InternalError, JsonPayloadError, PathError, QueryPayloadError};
use actix_web::{HttpRequest, HttpResponse, get, web};
use serde::Serialize;

use crate::judge::{JudgeError, Orchestrator};

#[derive(Serialize)]
pub struct ErrorResponse {
    pub reason: &'static str,
    pub code: u32,
}

#[derive(Serialize)]
pub struct ErrorResponseWithMessage {
    pub reason: &'static str,
    pub code: u32,
    pub message: String,
}

fn invalid_argument() -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        reason: "ERR_INVALID_ARGUMENT",
        code: 1,
    })
}

pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    InternalError::from_response(err, invalid_argument()).into()
}

pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    InternalError::from_response(err, invalid_argument()).into()
}

pub fn path_error_handler(err: PathError, _req: &HttpRequest) -> actix_web::Error {
    InternalError::from_response(err, invalid_argument()).into()
}

pub(crate) fn external_error(e: impl std::fmt::Display, what: &str) -> HttpResponse {
    log::error!("Failed to {what}: {e}");
    HttpResponse::InternalServerError().json(ErrorResponse {
        reason: "ERR_EXTERNAL",
        code: 5,
    })
}

pub(crate) fn not_found(message: String) -> HttpResponse {
    HttpResponse::NotFound().json(ErrorResponseWithMessage {
        reason: "ERR_NOT_FOUND",
        code: 3,
        message,
    })
}

/// Maps an orchestration failure to the response the caller sees
pub(crate) fn judge_error_response(e: &JudgeError) -> HttpResponse {
    match e {
        JudgeError::Validation { message } => {
            log::info!("Rejected batch: {message}");
            HttpResponse::BadRequest().json(ErrorResponseWithMessage {
                reason: "ERR_INVALID_ARGUMENT",
                code: 1,
                message: message.clone(),
            })
        }
        JudgeError::Transport { .. } => {
            log::error!("{e}");
            HttpResponse::BadGateway().json(ErrorResponseWithMessage {
                reason: "ERR_EXTERNAL",
                code: 5,
                message: "Code execution service unavailable.".to_string(),
            })
        }
        JudgeError::Timeout { .. } => {
            log::warn!("{e}");
            HttpResponse::GatewayTimeout().json(ErrorResponseWithMessage {
                reason: "ERR_TIMEOUT",
                code: 9,
                message: e.to_string(),
            })
        }
        JudgeError::Cancelled => {
            log::info!("Orchestration cancelled before completion");
            HttpResponse::ServiceUnavailable().json(ErrorResponse {
                reason: "ERR_INTERNAL",
                code: 6,
            })
        }
    }
}

#[get("/languages")]
pub async fn get_languages_handler(orchestrator: web::Data<Orchestrator>) -> HttpResponse {
    HttpResponse::Ok().json(orchestrator.languages())
}
