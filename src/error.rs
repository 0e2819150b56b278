use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::error;

use crate::db::StoreError;

/// Why a request was treated as unauthenticated. Every variant answers 401;
/// the code in the body tells them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    MissingToken,
    MalformedHeader,
    TokenExpired,
    TokenInvalid,
    UnknownUser,
    InvalidCredentials,
}

impl AuthFailure {
    pub fn code(self) -> &'static str {
        match self {
            AuthFailure::MissingToken => "MISSING_TOKEN",
            AuthFailure::MalformedHeader => "MALFORMED_AUTH_HEADER",
            AuthFailure::TokenExpired => "TOKEN_EXPIRED",
            AuthFailure::TokenInvalid => "TOKEN_INVALID",
            AuthFailure::UnknownUser => "USER_NOT_FOUND",
            AuthFailure::InvalidCredentials => "INVALID_CREDENTIALS",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            AuthFailure::MissingToken => "Missing Authorization header",
            AuthFailure::MalformedHeader => "Authorization header must be 'Bearer <token>'",
            AuthFailure::TokenExpired => "Token expired",
            AuthFailure::TokenInvalid => "Invalid token",
            AuthFailure::UnknownUser => "User no longer exists",
            AuthFailure::InvalidCredentials => "Invalid credentials",
        }
    }
}

/// HTTP-facing error. Handlers and services return this; `IntoResponse`
/// renders `{"error": true, "code": ..., "message": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{}", .0.message())]
    Unauthenticated(AuthFailure),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{message}")]
    Conflict {
        code: &'static str,
        message: String,
        details: Option<Value>,
    },

    #[error("Image upload failed")]
    UploadFailed(#[source] anyhow::Error),

    #[error("Internal server error")]
    Upstream(#[from] anyhow::Error),
}

impl ApiError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        ApiError::InvalidInput(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::Conflict {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(self, value: Value) -> Self {
        match self {
            ApiError::Conflict { code, message, .. } => ApiError::Conflict {
                code,
                message,
                details: Some(value),
            },
            other => other,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::UploadFailed(_) | ApiError::Upstream(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::Unauthenticated(reason) => reason.code(),
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict { code, .. } => *code,
            ApiError::UploadFailed(_) => "UPLOAD_FAILED",
            ApiError::Upstream(_) => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation { .. } => {
                ApiError::conflict("CONFLICT", "Resource already exists")
            }
            StoreError::ForeignKeyViolation { .. } => ApiError::conflict(
                "RESOURCE_REFERENCED",
                "Resource is referenced by other records",
            ),
            StoreError::Database(e) => {
                ApiError::Upstream(anyhow::Error::new(e).context("store query failed"))
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Upstream(e) => error!(error = ?e, "request failed"),
            ApiError::UploadFailed(e) => error!(error = ?e, "image upload failed"),
            _ => {}
        }

        let mut body = json!({
            "error": true,
            "code": self.code(),
            "message": self.to_string(),
        });
        if let ApiError::Conflict {
            details: Some(details),
            ..
        } = &self
        {
            body["details"] = details.clone();
        }

        (self.status_code(), Json(body)).into_response()
    }
}
