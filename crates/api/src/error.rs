//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use saga::{SagaError, StepError};
use services::ServiceError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Saga execution error.
    Saga(SagaError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Saga(err) => saga_error_to_response(err),
        };

        if status.is_server_error() {
            tracing::error!(%status, error = %message, "request failed");
        }

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn saga_error_to_response(err: SagaError) -> (StatusCode, String) {
    let status = match &err {
        SagaError::UnknownScenario(_) | SagaError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        SagaError::TooLateToCancel { .. } | SagaError::InvalidTransition { .. } => {
            StatusCode::CONFLICT
        }
        SagaError::OrderNotReady(_) | SagaError::ProductNotInOrder { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        SagaError::StepFailed { source, .. } => step_error_status(source),
        SagaError::ScenarioCheck(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

fn step_error_status(err: &StepError) -> StatusCode {
    match err {
        StepError::Registry(registry::RegistryError::Timeout { .. }) | StepError::Timeout(_) => {
            StatusCode::GATEWAY_TIMEOUT
        }
        StepError::Registry(_) => StatusCode::SERVICE_UNAVAILABLE,
        StepError::Service(service) => match service {
            ServiceError::NotFound { .. }
            | ServiceError::AlreadyPaid { .. }
            | ServiceError::AmountMismatch { .. }
            | ServiceError::InvalidValue { .. }
            | ServiceError::RefundExceedsValue { .. }
            | ServiceError::NotPaid { .. }
            | ServiceError::OutOfStock { .. }
            | ServiceError::StockOverflow { .. }
            | ServiceError::AlreadyDispatched { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::ConnectionRefused { .. }
            | ServiceError::WrongService { .. }
            | ServiceError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        },
    }
}

impl From<SagaError> for ApiError {
    fn from(err: SagaError) -> Self {
        ApiError::Saga(err)
    }
}
