use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, AppError>;

/// Every failure surfaces as `{error, code}` JSON with a stable machine
/// readable code, so clients never have to match on prose.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Validation { code: &'static str, message: String },
    #[error("{message}")]
    Unauthorized { code: &'static str, message: String },
    #[error("{message}")]
    Forbidden { code: &'static str, message: String },
    #[error("{message}")]
    NotFound { code: &'static str, message: String },
    #[error("{message}")]
    Conflict { code: &'static str, message: String },
    #[error("{message}")]
    PayloadTooLarge { code: &'static str, message: String },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            code,
            message: message.into(),
        }
    }

    pub fn unauthorized(code: &'static str, message: impl Into<String>) -> Self {
        Self::Unauthorized {
            code,
            message: message.into(),
        }
    }

    pub fn forbidden(code: &'static str, message: impl Into<String>) -> Self {
        Self::Forbidden {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        Self::NotFound {
            code,
            message: message.into(),
        }
    }

    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        Self::Conflict {
            code,
            message: message.into(),
        }
    }

    pub fn payload_too_large(code: &'static str, message: impl Into<String>) -> Self {
        Self::PayloadTooLarge {
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Validation { code, message } => (StatusCode::BAD_REQUEST, code, message),
            AppError::Unauthorized { code, message } => (StatusCode::UNAUTHORIZED, code, message),
            AppError::Forbidden { code, message } => (StatusCode::FORBIDDEN, code, message),
            AppError::NotFound { code, message } => (StatusCode::NOT_FOUND, code, message),
            AppError::Conflict { code, message } => (StatusCode::CONFLICT, code, message),
            AppError::PayloadTooLarge { code, message } => {
                (StatusCode::PAYLOAD_TOO_LARGE, code, message)
            }
            AppError::Database(err) => return internal_response(err.to_string()),
            AppError::Internal(message) => return internal_response(message),
        };

        (status, Json(json!({ "error": message, "code": code }))).into_response()
    }
}

/// Internal errors carry a request id for log correlation; the underlying
/// message is replaced by a generic one in production.
fn internal_response(detail: String) -> Response {
    let request_id = Uuid::new_v4().to_string();
    tracing::error!(request_id = %request_id, "internal error: {detail}");

    let message = if crate::config::in_production() {
        "An unexpected error occurred".to_string()
    } else {
        detail
    };

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": message,
            "code": "INTERNAL_ERROR",
            "requestId": request_id,
        })),
    )
        .into_response()
}
