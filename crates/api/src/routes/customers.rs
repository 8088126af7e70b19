//! Customer endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::CustomerId;
use serde::Deserialize;
use services::{Customer, ServiceError};

use crate::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CreateCustomerRequest {
    pub name: String,
    pub address: String,
}

/// POST /customers: registers a customer.
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateCustomerRequest>,
) -> Result<(StatusCode, Json<Customer>), ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Customer name is required".to_string()));
    }
    let customer = state
        .orchestrator
        .create_customer(&req.name, &req.address)
        .await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

/// GET /customers/{id}: returns a customer.
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Customer>, ApiError> {
    let id: u32 = id
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))?;
    let id = CustomerId::new(id);
    match state.orchestrator.get_customer(id).await {
        Ok(customer) => Ok(Json(customer)),
        Err(err) if matches!(err.service_error(), Some(ServiceError::NotFound { .. })) => {
            Err(ApiError::NotFound(format!("Customer {id} not found")))
        }
        Err(err) => Err(err.into()),
    }
}
