//! Scenario endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use saga::{Scenario, ScenarioOutcome};
use serde::Serialize;
use services::{Customer, Payment};

use crate::AppState;
use crate::error::ApiError;
use crate::routes::orders::OrderResponse;

#[derive(Serialize)]
pub struct ScenarioListResponse {
    pub scenarios: Vec<&'static str>,
}

#[derive(Serialize)]
pub struct ScenarioResponse {
    pub scenario: &'static str,
    pub customers: Vec<Customer>,
    pub orders: Vec<OrderResponse>,
    pub payments: Vec<Payment>,
}

impl From<ScenarioOutcome> for ScenarioResponse {
    fn from(outcome: ScenarioOutcome) -> Self {
        Self {
            scenario: outcome.scenario,
            customers: outcome.customers,
            orders: outcome.orders.iter().map(OrderResponse::from).collect(),
            payments: outcome.payments,
        }
    }
}

/// GET /scenarios: lists the runnable scenarios.
pub async fn list() -> Json<ScenarioListResponse> {
    Json(ScenarioListResponse {
        scenarios: Scenario::ALL.iter().map(Scenario::name).collect(),
    })
}

/// POST /scenarios/{name}: runs a scenario end-to-end.
pub async fn run(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<ScenarioResponse>, ApiError> {
    let outcome = state.orchestrator.run_scenario(&name).await?;
    Ok(Json(outcome.into()))
}
