use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not authenticated: {0}")]
    Unauthorized(String),

    #[error("Backend unreachable: {0}")]
    BackendUnreachable(String),

    #[error("Invalid backend response: {0}")]
    InvalidBackendResponse(String),

    #[error("Backend returned {status}: {body}")]
    Backend { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Session token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Error: {0}")]
    Anyhow(#[from] anyhow::Error),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    pub fn unauthorized<S: Into<String>>(msg: S) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn unreachable<S: Into<String>>(msg: S) -> Self {
        Self::BackendUnreachable(msg.into())
    }

    pub fn invalid_backend_response<S: Into<String>>(msg: S) -> Self {
        Self::InvalidBackendResponse(msg.into())
    }

    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// HTTP status this error maps to when it reaches the browser.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BackendUnreachable(_) | Self::Network(_) => StatusCode::BAD_GATEWAY,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Backend { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::InvalidBackendResponse(_)
            | Self::Token(_)
            | Self::Json(_)
            | Self::Anyhow(_)
            | Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether retrying the same call later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::BackendUnreachable(_) | Self::Network(_) => true,
            Self::Backend { status, .. } => matches!(status, 429 | 500..=599),
            _ => false,
        }
    }

    pub fn is_pii_safe(&self) -> bool {
        match self {
            Self::Network(_) | Self::Anyhow(_) | Self::Json(_) | Self::Backend { .. } => false,
            Self::Unauthorized(_)
            | Self::BackendUnreachable(_)
            | Self::InvalidBackendResponse(_)
            | Self::Token(_)
            | Self::InvalidInput(_)
            | Self::Config(_)
            | Self::NotFound(_) => true,
        }
    }

    pub fn to_safe_string(&self) -> String {
        if self.is_pii_safe() {
            self.to_string()
        } else {
            match self {
                Self::Network(_) => "Network request failed".to_string(),
                Self::Json(_) => "Malformed payload".to_string(),
                Self::Backend { status, .. } => format!("Backend request failed with status {}", status),
                _ => "Operation failed".to_string(),
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            Self::Unauthorized(detail) => json!({ "detail": detail }),
            Self::BackendUnreachable(detail) => {
                json!({ "error": "Backend unreachable", "detail": detail })
            }
            Self::Network(_) => {
                json!({ "error": "Backend unreachable", "detail": self.to_safe_string() })
            }
            Self::InvalidBackendResponse(detail) => {
                json!({ "error": "Invalid backend response", "detail": detail })
            }
            Self::InvalidInput(msg) => json!({ "error": msg }),
            Self::NotFound(what) => json!({ "error": format!("Not found: {}", what) }),
            Self::Backend { body, .. } => match serde_json::from_str::<serde_json::Value>(body) {
                Ok(value) => value,
                Err(_) => json!({ "error": "Backend error", "detail": body }),
            },
            Self::Token(_) | Self::Json(_) | Self::Anyhow(_) | Self::Config(_) => {
                log::error!("Internal error: {}", self);
                json!({ "error": "Internal server error" })
            }
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
