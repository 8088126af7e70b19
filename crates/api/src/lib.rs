//! HTTP API server hosting the fulfillment services and the saga orchestrator.
//!
//! Boots the four domain services in-process, keeps their registry leases
//! alive, and exposes scenario runs and the order saga over REST, with
//! structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use log_bus::{LogPublisher, TracingLogSink};
use metrics_exporter_prometheus::PrometheusHandle;
use registry::{InMemoryDirectory, RegistryClient, RegistryError};
use saga::{Orchestrator, RegistryResolver, seed_inventory};
use services::{
    InMemoryCustomerService, InMemoryInventoryService, InMemoryPaymentService,
    InMemoryShippingService, LocalNetwork, ServiceHandle, ServiceHost,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;

/// Addresses the domain services listen on.
pub const CUSTOMER_ADDRESS: &str = "127.0.0.1:50051";
pub const PAYMENT_ADDRESS: &str = "127.0.0.1:50052";
pub const INVENTORY_ADDRESS: &str = "127.0.0.1:50053";
pub const SHIPPING_ADDRESS: &str = "127.0.0.1:50054";

/// Shared application state accessible from all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub registry: RegistryClient,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::status::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::status::health))
        .route("/customers", post(routes::customers::create))
        .route("/customers/{id}", get(routes::customers::get))
        .route("/scenarios", get(routes::scenarios::list))
        .route("/scenarios/{name}", post(routes::scenarios::run))
        .route("/orders", post(routes::orders::create))
        .route("/orders", get(routes::orders::list))
        .route("/orders/{id}", get(routes::orders::get))
        .route("/orders/{id}/pay", post(routes::orders::pay))
        .route("/orders/{id}/ship", post(routes::orders::ship))
        .route("/orders/{id}/cancel", post(routes::orders::cancel))
        .route(
            "/orders/{id}/stock-arrivals",
            post(routes::orders::stock_arrival),
        )
        .route("/orders/{id}/returns", post(routes::orders::process_return))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Starts the domain services and builds the orchestrator over them.
///
/// Every service is registered by the time this returns. Returns the
/// application state and the running service hosts; dropping a host does not
/// stop it, call [`ServiceHost::stop`] on shutdown.
pub async fn create_default_state(
    config: &Config,
) -> Result<(Arc<AppState>, Vec<ServiceHost>), RegistryError> {
    let network = LocalNetwork::new();
    let registry = RegistryClient::new(Arc::new(InMemoryDirectory::new()))
        .with_call_timeout(config.call_timeout);

    let inventory = InMemoryInventoryService::new();
    seed_inventory(&inventory).await;

    let services = [
        (
            CUSTOMER_ADDRESS,
            ServiceHandle::Customer(Arc::new(InMemoryCustomerService::new())),
        ),
        (
            PAYMENT_ADDRESS,
            ServiceHandle::Payment(Arc::new(InMemoryPaymentService::new())),
        ),
        (
            INVENTORY_ADDRESS,
            ServiceHandle::Inventory(Arc::new(inventory)),
        ),
        (
            SHIPPING_ADDRESS,
            ServiceHandle::Shipping(Arc::new(InMemoryShippingService::new())),
        ),
    ];

    let mut hosts = Vec::with_capacity(services.len());
    for (address, handle) in services {
        let host = ServiceHost::start(
            network.clone(),
            registry.clone(),
            address,
            handle,
            config.lease(),
        )
        .await?;
        hosts.push(host);
    }

    let (log, _) = LogPublisher::spawn(Arc::new(TracingLogSink), config.log_channel_capacity);
    let resolver = RegistryResolver::new(registry.clone(), network);
    let orchestrator = Orchestrator::new(Arc::new(resolver), log, config.orchestrator());

    Ok((
        Arc::new(AppState {
            orchestrator,
            registry,
        }),
        hosts,
    ))
}
