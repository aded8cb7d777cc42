//! HTTP mapping for service errors.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use strata_core::error::StrataError;

/// Newtype so service errors can be returned from handlers directly.
pub struct ApiError(pub StrataError);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<StrataError> for ApiError {
    fn from(e: StrataError) -> Self {
        ApiError(e)
    }
}

impl From<strata_auth::AuthError> for ApiError {
    fn from(e: strata_auth::AuthError) -> Self {
        ApiError(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            StrataError::NotFound { .. } => (StatusCode::NOT_FOUND, self.0.to_string()),
            StrataError::AlreadyExists { .. } | StrataError::LimitExceeded { .. } => {
                (StatusCode::CONFLICT, self.0.to_string())
            }
            StrataError::InvalidFormat { .. } => (StatusCode::BAD_REQUEST, self.0.to_string()),
            StrataError::Unauthorized { .. } => (StatusCode::UNAUTHORIZED, self.0.to_string()),
            StrataError::TenantContext => (StatusCode::BAD_REQUEST, self.0.to_string()),
            // Internal detail never reaches the client.
            StrataError::Provisioning { .. }
            | StrataError::Configuration { .. }
            | StrataError::Database(_)
            | StrataError::Internal(_) => {
                error!(error = %self.0, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let cases = [
            (
                StrataError::NotFound {
                    entity: "tenant".into(),
                    id: "x".into(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                StrataError::AlreadyExists {
                    entity: "tenant".into(),
                },
                StatusCode::CONFLICT,
            ),
            (
                StrataError::LimitExceeded {
                    entity: "user".into(),
                    limit: 5,
                },
                StatusCode::CONFLICT,
            ),
            (
                StrataError::InvalidFormat {
                    message: "bad".into(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                StrataError::Unauthorized {
                    reason: "nope".into(),
                },
                StatusCode::UNAUTHORIZED,
            ),
            (StrataError::TenantContext, StatusCode::BAD_REQUEST),
            (
                StrataError::Database("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError(err).into_response().status(), expected);
        }
    }
}
