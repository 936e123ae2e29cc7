use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Single HTTP-facing error type shared by every route handler across the
/// three binaries.
#[derive(Debug, Clone)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        AppError {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    pub fn gateway_timeout(message: impl Into<String>) -> Self {
        Self::new(StatusCode::GATEWAY_TIMEOUT, message)
    }

    pub fn client_closed_request(message: impl Into<String>) -> Self {
        // 499 has no axum::http::StatusCode constant; it is a de facto
        // nginx convention for "client disconnected before response".
        Self::new(StatusCode::from_u16(499).unwrap(), message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl std::error::Error for AppError {}

/// Maps a Postgres error to an HTTP status using its SQLSTATE code where
/// available, falling back to 500.
pub fn map_db_error(err: sqlx::Error) -> AppError {
    if let sqlx::Error::RowNotFound = err {
        return AppError::not_found("record not found");
    }
    if let Some(db_err) = err.as_database_error() {
        if let Some(code) = db_err.code() {
            return match code.as_ref() {
                "23505" => AppError::conflict(db_err.message().to_string()),
                "23503" | "23502" | "22P02" => AppError::bad_request(db_err.message().to_string()),
                _ => AppError::internal(db_err.message().to_string()),
            };
        }
    }
    tracing::error!(error = %err, "unhandled database error");
    AppError::internal("database error")
}
