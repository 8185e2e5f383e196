use actix_web::{HttpResponse, http::StatusCode};
use derive_more::Display;

use crate::store::StoreError;

/// Operation failures surfaced to HTTP callers.
///
/// Best-effort side effects (notification fan-out, broadcasts) never show up
/// here; they are caught and logged at the call site.
#[derive(Debug, Display)]
pub enum AppError {
    #[display(fmt = "{}", _0)]
    InvalidArgument(String),

    #[display(fmt = "{}", _0)]
    NotFound(String),

    #[display(fmt = "{}", _0)]
    Conflict(String),

    #[display(fmt = "storage failure: {}", _0)]
    Storage(StoreError),
}

impl std::error::Error for AppError {}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Storage(e)
    }
}

impl AppError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        AppError::InvalidArgument(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::Conflict(msg.into())
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Storage(e) => {
                tracing::error!(error = %e, "store operation failed");
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "message": "Internal Server Error"
                }))
            }
            other => HttpResponse::build(self.status_code()).json(serde_json::json!({
                "message": other.to_string()
            })),
        }
    }
}
