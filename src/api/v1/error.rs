use crate::api::v1::handler::ApiResponse;
use crate::application_port::*;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::{debug, error, warn};
use warp::body::BodyDeserializeError;
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let code = if let Some(code) = err.find::<ApiErrorCode>() {
        *code
    } else if err.is_not_found() {
        ApiErrorCode::NotFound
    } else if err.find::<BodyDeserializeError>().is_some()
        || err.find::<reject::PayloadTooLarge>().is_some()
        || err.find::<reject::UnsupportedMediaType>().is_some()
    {
        ApiErrorCode::BadRequest
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        ApiErrorCode::NotFound
    } else {
        warn!(rejection = ?err, "unhandled rejection");
        ApiErrorCode::InternalError
    };

    let json = warp::reply::json(&ApiResponse::<()>::err(code, code.to_string()));
    Ok(warp::reply::with_status(json, code.status()))
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

/// What a client may learn about a failure. Domain failures all collapse to
/// `Unauthorized` so the response never says which check failed.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Error, Serialize)]
pub enum ApiErrorCode {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Malformed request")]
    BadRequest,
    #[error("Not found")]
    NotFound,
    #[error("Service temporarily unavailable")]
    ServiceUnavailable,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        error!(%error, "internal error");
        ApiErrorCode::InternalError
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl reject::Reject for ApiErrorCode {}

impl From<AuthError> for ApiErrorCode {
    fn from(error: AuthError) -> Self {
        match error {
            e if e.is_domain() => {
                debug!(error = %e, "request unauthorized");
                ApiErrorCode::Unauthorized
            }
            AuthError::Cancelled | AuthError::DeadlineExceeded => {
                warn!(%error, "request aborted");
                ApiErrorCode::ServiceUnavailable
            }
            other => ApiErrorCode::internal(other),
        }
    }
}
