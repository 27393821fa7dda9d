use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use quickstart_core::{ValidationErrors, ViewSetError};
use serde_json::{Map, Value, json};
use std::fmt;

pub type AppResult<T> = Result<T, AppError>;

pub const MSG_NOT_FOUND: &str = "Not found.";
pub const MSG_VALIDATION_FAILED: &str = "Validation failed";

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
    /// Per-field messages for validation failures.
    pub fields: Option<ValidationErrors>,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            fields: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn validation(errors: ValidationErrors) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: MSG_VALIDATION_FAILED.to_string(),
            fields: Some(errors),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut error = Map::new();
        error.insert("message".into(), Value::String(self.message));
        error.insert("status".into(), json!(self.status.as_u16()));
        if let Some(fields) = self.fields {
            error.insert("fields".into(), json!(fields));
        }

        (self.status, Json(json!({ "error": error }))).into_response()
    }
}

impl From<ViewSetError> for AppError {
    fn from(err: ViewSetError) -> Self {
        match err {
            ViewSetError::Validation(errors) => Self::validation(errors),
            ViewSetError::NotFound => Self::not_found(MSG_NOT_FOUND),
            // Already logged where the storage call failed.
            ViewSetError::Storage(_) => Self::internal("Storage operation failed"),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use quickstart_core::StoreError;

    async fn body_json(error: AppError) -> (StatusCode, Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_errors_carry_field_messages() {
        let errors = ValidationErrors::single("username", "This field is required.");
        let (status, body) = body_json(ViewSetError::Validation(errors).into()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({
                "error": {
                    "message": "Validation failed",
                    "status": 400,
                    "fields": {"username": ["This field is required."]}
                }
            })
        );
    }

    #[tokio::test]
    async fn not_found_has_no_fields() {
        let (status, body) = body_json(ViewSetError::NotFound.into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": {"message": "Not found.", "status": 404}}));
    }

    #[tokio::test]
    async fn storage_failures_hide_details() {
        let err = ViewSetError::Storage(StoreError::Internal("password=hunter2".into()));
        let (status, body) = body_json(err.into()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.to_string().contains("hunter2"));
    }
}
