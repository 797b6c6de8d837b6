use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mediator::MediatorError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Mediator error: {0}")]
    Mediator(#[from] MediatorError),
}

/// Converts our custom `AppError` into an HTTP response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Mediator(MediatorError::Broker(e)) => {
                tracing::error!(error = %e, "Broker error.");
                (
                    StatusCode::BAD_GATEWAY,
                    "A broker request failed".to_string(),
                )
            }
            AppError::Mediator(MediatorError::Database(e)) => {
                tracing::error!(error = %e, "Database error.");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal database error occurred".to_string(),
                )
            }
            AppError::Mediator(e) => {
                tracing::error!(error = %e, "Mediator error.");
                (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
