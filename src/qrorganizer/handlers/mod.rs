pub mod account;
pub use self::account::{create, login, logout, CookieSettings};

pub mod health;
pub use self::health::health;

pub mod site;
pub use self::site::site;

pub mod types;


use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use self::types::{ErrorResponse, IdentityResult};
use crate::account::AccountError;

const INTERNAL_ERROR: &str = "Internal server error";

pub(crate) fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            errors: vec![message.to_string()],
        }),
    )
        .into_response()
}

pub(crate) fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            errors: vec![INTERNAL_ERROR.to_string()],
        }),
    )
        .into_response()
}

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound | Self::EmailNotConfirmed => bad_request(&self.to_string()),
            Self::Validation(errors) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { errors })).into_response()
            }
            // No body: callers must not learn which part of the credential failed.
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::IdentityCreation(errors) => (
                StatusCode::UNAUTHORIZED,
                Json(IdentityResult {
                    succeeded: false,
                    errors,
                }),
            )
                .into_response(),
            Self::Internal(err) => {
                error!("Internal error: {err:#}");
                internal_error()
            }
        }
    }
}
