//! Health and metrics endpoints.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use services::ServiceKind;

use crate::AppState;

const SERVICES: [ServiceKind; 4] = [
    ServiceKind::Customer,
    ServiceKind::Payment,
    ServiceKind::Inventory,
    ServiceKind::Shipping,
];

#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok` when every service holds a live lease, `degraded` otherwise.
    pub status: &'static str,
    pub services: BTreeMap<&'static str, Option<String>>,
}

/// GET /health: reports the registered address of every domain service.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let mut services = BTreeMap::new();
    for kind in SERVICES {
        let address = state.registry.resolve(kind.name()).await.ok();
        services.insert(kind.name(), address);
    }

    let status = if services.values().all(Option::is_some) {
        "ok"
    } else {
        "degraded"
    };
    Json(HealthResponse { status, services })
}

/// GET /metrics: returns Prometheus-formatted metrics.
pub async fn metrics(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        handle.render(),
    )
}
