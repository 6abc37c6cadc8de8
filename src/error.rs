use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid user id: {0}")]
    InvalidUserId(String),

    #[error("Expense service returned {status}")]
    UpstreamStatus {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Expense service unreachable: {0}")]
    UpstreamTransport(#[source] reqwest::Error),

    #[error("Expense service timed out")]
    UpstreamTimeout,

    #[error("Malformed expense payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
}

impl AppError {
    /// Whether another attempt against the expense service could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::UpstreamStatus { status, .. } => status.is_server_error(),
            AppError::UpstreamTransport(_) | AppError::UpstreamTimeout => true,
            AppError::InvalidUserId(_) | AppError::MalformedPayload(_) => false,
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::UpstreamTimeout
        } else {
            AppError::UpstreamTransport(err)
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidUserId(_) => StatusCode::BAD_REQUEST,
            AppError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            AppError::UpstreamStatus { .. }
            | AppError::UpstreamTransport(_)
            | AppError::MalformedPayload(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            status: "error".to_string(),
            message: self.to_string(),
        })
    }
}
