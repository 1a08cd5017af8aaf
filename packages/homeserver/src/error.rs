use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::storage::StorageError;
use sea_orm::DbErr;
use serde::Serialize;

use crate::federation::FederationError;

/// Matrix-style error body returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `M_INVALID_PARAM`, `M_BAD_JSON`,
    /// `M_MISSING_TOKEN`, `M_UNKNOWN_TOKEN`, `M_FORBIDDEN`, `M_UNAUTHORIZED`,
    /// `M_NOT_FOUND`, `M_USER_IN_USE`, `M_TOO_LARGE`, `M_UNKNOWN`.
    #[schema(example = "M_NOT_FOUND")]
    pub errcode: &'static str,
    /// Human-readable error description.
    #[schema(example = "Profile not found")]
    pub error: String,
}

#[derive(Debug)]
pub enum AppError {
    Validation(String),
    BadJson(String),
    TokenMissing,
    TokenInvalid,
    InvalidCredentials,
    PermissionDenied(String),
    /// Federation request without a valid signature.
    Unauthorized(String),
    NotFound(String),
    UserInUse,
    TooLarge {
        limit: u64,
    },
    /// A remote homeserver could not be reached or answered with garbage.
    Remote(String),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    errcode: "M_INVALID_PARAM",
                    error: msg,
                },
            ),
            AppError::BadJson(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    errcode: "M_BAD_JSON",
                    error: msg,
                },
            ),
            AppError::TokenMissing => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    errcode: "M_MISSING_TOKEN",
                    error: "Missing access token".into(),
                },
            ),
            AppError::TokenInvalid => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    errcode: "M_UNKNOWN_TOKEN",
                    error: "Invalid or expired access token".into(),
                },
            ),
            AppError::InvalidCredentials => (
                StatusCode::FORBIDDEN,
                ErrorBody {
                    errcode: "M_FORBIDDEN",
                    error: "Invalid username or password".into(),
                },
            ),
            AppError::PermissionDenied(msg) => (
                StatusCode::FORBIDDEN,
                ErrorBody {
                    errcode: "M_FORBIDDEN",
                    error: msg,
                },
            ),
            AppError::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    errcode: "M_UNAUTHORIZED",
                    error: msg,
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    errcode: "M_NOT_FOUND",
                    error: msg,
                },
            ),
            AppError::UserInUse => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    errcode: "M_USER_IN_USE",
                    error: "User ID already taken".into(),
                },
            ),
            AppError::TooLarge { limit } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                ErrorBody {
                    errcode: "M_TOO_LARGE",
                    error: format!("Upload exceeds the maximum size of {limit} bytes"),
                },
            ),
            AppError::Remote(detail) => {
                tracing::warn!("Remote server error: {}", detail);
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorBody {
                        errcode: "M_UNKNOWN",
                        error: "Failed to reach remote server".into(),
                    },
                )
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        errcode: "M_UNKNOWN",
                        error: "An unexpected error occurred".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(hash) => {
                tracing::error!("Media row points at missing blob {hash}");
                AppError::NotFound("Media not found".into())
            }
            StorageError::SizeLimitExceeded { limit, .. } => AppError::TooLarge { limit },
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<FederationError> for AppError {
    fn from(err: FederationError) -> Self {
        match err {
            FederationError::NotFound => AppError::NotFound("Profile not found".into()),
            FederationError::UnknownDestination(server) => {
                AppError::NotFound(format!("Unknown server '{server}'"))
            }
            other => AppError::Remote(other.to_string()),
        }
    }
}
