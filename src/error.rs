use std::sync::Arc;

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;

use crate::settlement::SettlementError;

/// Errors returned by the HTTP handlers.
#[derive(Debug, Display)]
pub enum ApiError {
    #[display(fmt = "{}", _0)]
    Validation(SettlementError),

    #[display(fmt = "{}", _0)]
    BadRequest(String),

    #[display(fmt = "{} not found", _0)]
    NotFound(&'static str),

    /// Detail is logged, never sent to the client
    #[display(fmt = "Failed to process payment")]
    Database(String),
}

impl std::error::Error for ApiError {}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "message": self.to_string()
        }))
    }
}

impl From<SettlementError> for ApiError {
    fn from(e: SettlementError) -> Self {
        ApiError::Validation(e)
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        tracing::error!(error = %e, "Database operation failed");
        ApiError::Database(e.to_string())
    }
}

// moka hands loader errors back wrapped in an Arc
impl From<Arc<sqlx::Error>> for ApiError {
    fn from(e: Arc<sqlx::Error>) -> Self {
        tracing::error!(error = %e, "Loading site balances failed");
        ApiError::Database(e.to_string())
    }
}
