use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("sign-in required")]
    Unauthenticated,

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Configuration(String),

    /// The provider API answered with a failure or a payload we could not use.
    #[error("provider request failed: {message}")]
    Upstream { status: Option<u16>, message: String },

    /// A remote resource (generated image) could not be fetched.
    #[error("failed to fetch image: {message}")]
    Fetch { status: Option<u16>, message: String },

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Configuration(_) | AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Fetch { status, .. } => status
                .and_then(|code| StatusCode::from_u16(code).ok())
                .filter(|code| code.is_client_error() || code.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
        }
    }

    fn summary(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "Invalid request",
            AppError::Unauthenticated => "Sign-in required",
            AppError::NotFound(_) => "Not found",
            AppError::Configuration(_) => "Server misconfigured",
            AppError::Upstream { .. } => "Failed to generate image",
            AppError::Fetch { .. } => "Failed to fetch image",
            AppError::Storage(_) => "Failed to access saved data",
        }
    }

    fn details(&self) -> String {
        match self {
            AppError::Upstream {
                status: Some(status),
                message,
            } => format!("provider error {status}: {message}"),
            AppError::Fetch {
                status: Some(status),
                message,
            } => format!("upstream returned {status}: {message}"),
            AppError::Upstream { message, .. } | AppError::Fetch { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            success: false,
            error: self.summary().to_string(),
            details: Some(self.details()),
        };
        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_errors_relay_upstream_status() {
        let err = AppError::Fetch {
            status: Some(404),
            message: "Not Found".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn fetch_errors_without_status_are_bad_gateway() {
        let err = AppError::Fetch {
            status: None,
            message: "connection refused".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);

        let redirect = AppError::Fetch {
            status: Some(304),
            message: "Not Modified".to_string(),
        };
        assert_eq!(redirect.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn provider_errors_are_internal() {
        let err = AppError::Upstream {
            status: Some(429),
            message: "rate limited".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.details(), "provider error 429: rate limited");
    }
}
