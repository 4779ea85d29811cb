use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Names the missing resource, e.g. `NotFound("User")`.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A unique column already holds the submitted value.
    #[error("{0} already exists")]
    Conflict(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("password hashing failed")]
    PasswordHash,
}

/// Maps the column named in a SQLite unique violation
/// (`UNIQUE constraint failed: users.email`) to the conflicting field.
fn conflicting_field(message: &str) -> &'static str {
    if message.contains("users.username") {
        "Username"
    } else if message.contains("users.email") {
        "Email"
    } else {
        "Record"
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err
            && db_err.is_unique_violation()
        {
            return ApiError::Conflict(conflicting_field(db_err.message()));
        }
        ApiError::Database(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Database(_) | ApiError::PasswordHash => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = if status.is_server_error() {
            error!("request failed: {}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
