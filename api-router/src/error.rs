use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::error::AppError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Serialize, Clone)]
pub enum ApiError {
    #[error("\"{0}\" already exists")]
    NamespaceExists(String),

    #[error("\"{0}\" is not a valid pathname")]
    IllegalName(String),

    #[error("\"{0}\" does not exist")]
    NamespaceDoesNotExist(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal server error")]
    InternalError(String),
}

impl ApiError {
    /// Stable machine-readable code carried in the response body.
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NamespaceExists(_) => "namespace_exists",
            Self::IllegalName(_) => "illegal_name",
            Self::NamespaceDoesNotExist(_) => "namespace_does_not_exist",
            Self::NotFound(_) => "not_found",
            Self::ValidationError(_) => "validation_error",
            Self::InternalError(_) => "internal_error",
        }
    }

    const fn status_code(&self) -> StatusCode {
        match self {
            Self::NamespaceExists(_) | Self::IllegalName(_) | Self::ValidationError(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::NamespaceDoesNotExist(_) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::NameExists(pathname) => Self::NamespaceExists(pathname),
            AppError::IllegalName(pathname) => Self::IllegalName(pathname),
            AppError::NamespaceDoesNotExist(pathname) => Self::NamespaceDoesNotExist(pathname),
            AppError::NotFound(msg) => Self::NotFound(msg),
            AppError::Validation(msg) => Self::ValidationError(msg),
            other => {
                // Inconsistencies and infrastructure failures are operational
                // alarms; the response body stays generic.
                tracing::error!("Internal error: {:?}", other);
                Self::InternalError("Internal server error".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: match &self {
                Self::InternalError(_) => "Internal server error".to_string(),
                other => other.to_string(),
            },
            error_code: self.error_code().to_string(),
            status: "error".to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Serialize, Debug)]
struct ErrorResponse {
    error: String,
    error_code: String,
    status: String,
}
