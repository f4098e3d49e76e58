use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt::Display;
use thiserror::Error;

/// Failures of the decision core and its remote collaborators.
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("analysis failed: {0}")]
    Analysis(String),

    #[error("invalid state: {0}")]
    State(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl SignalError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn state(message: impl Into<String>) -> Self {
        Self::State(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}

pub type SignalResult<T> = Result<T, SignalError>;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    error: String,
    message: Option<String>,
}

impl AppError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn bad_request(error: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error)
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "resource not found")
    }

    pub fn internal<E: Display>(error: E) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = Json(ErrorResponse {
            error: self.error,
            message: self.message,
        });
        (status, body).into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl From<SignalError> for AppError {
    fn from(value: SignalError) -> Self {
        match value {
            SignalError::Validation(message) => AppError::bad_request(message),
            SignalError::NotFound(message) => AppError::new(StatusCode::NOT_FOUND, message),
            SignalError::State(message) => AppError::new(StatusCode::CONFLICT, message),
            other => AppError::internal(other),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        AppError::internal(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        AppError::internal(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_domain_errors_to_statuses() {
        let cases = [
            (SignalError::validation("title is required"), StatusCode::BAD_REQUEST),
            (SignalError::not_found("decision x"), StatusCode::NOT_FOUND),
            (SignalError::state("review already in progress"), StatusCode::CONFLICT),
            (SignalError::Analysis("timeout".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (SignalError::Extraction("bad json".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, expected) in cases {
            assert_eq!(AppError::from(error).status(), expected);
        }
    }

    #[test]
    fn anyhow_converts_into_storage_error() {
        let error: SignalError = anyhow::anyhow!("disk full").into();
        assert!(matches!(error, SignalError::Storage(_)));
        assert_eq!(error.to_string(), "storage error: disk full");
    }
}
