use actix_web::{error::BlockingError, http::StatusCode, HttpResponse, ResponseError};
use cpu_burn::LoadError;
use serde::Serialize;
use thiserror::Error;

/// Errors returned from handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Load run failed: {0}")]
    Load(#[from] LoadError),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
}

impl ApiError {
    fn error_type(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NotFound",
            ApiError::Load(_) => "LoadError",
            ApiError::InternalError(_) => "InternalServerError",
        }
    }
}

impl From<BlockingError> for ApiError {
    fn from(error: BlockingError) -> Self {
        ApiError::InternalError(error.to_string())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Load(_) | ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "client error");
        }

        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.error_type(),
            message: self.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            ApiError::NotFound("cpu-1".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Load(LoadError::WorkerPanicked { count: 1 }).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::InternalError("pool gone".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_display() {
        let error = ApiError::NotFound("cpu-7".to_string());
        assert_eq!(error.to_string(), "Task not found: cpu-7");
        assert_eq!(error.error_type(), "NotFound");
    }
}
