//! Benchmarks for the order state machine and a full in-stock run.

use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

use criterion::{Criterion, criterion_group, criterion_main};
use log_bus::{LogPublisher, TracingLogSink};
use registry::{InMemoryDirectory, RegistryClient};
use saga::{
    Orchestrator, OrchestratorConfig, OrderEvent, OrderState, RegistryResolver, transition,
};
use services::{
    InMemoryCustomerService, InMemoryInventoryService, InMemoryPaymentService,
    InMemoryShippingService, LocalNetwork, ServiceHandle,
};

fn bench_forward_path(c: &mut Criterion) {
    let events = [
        OrderEvent::Placed,
        OrderEvent::StockReserved,
        OrderEvent::PaymentSubmitted,
        OrderEvent::ShipmentRequested,
    ];

    c.bench_function("transition_forward_path", |b| {
        b.iter(|| {
            let mut state = OrderState::Created;
            for event in &events {
                let (next, effects) = transition(state, black_box(event)).unwrap();
                black_box(effects);
                state = next;
            }
            state
        });
    });
}

fn bench_in_stock_scenario(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let orchestrator = rt.block_on(async {
        let network = LocalNetwork::new();
        let registry = RegistryClient::new(Arc::new(InMemoryDirectory::new()));
        let inventory = InMemoryInventoryService::new();
        for product in saga::scenarios::CATALOGUE {
            inventory.set_stock(product.id, u32::MAX / 2).await;
        }

        let handles = [
            ServiceHandle::Customer(Arc::new(InMemoryCustomerService::new())),
            ServiceHandle::Payment(Arc::new(InMemoryPaymentService::new())),
            ServiceHandle::Inventory(Arc::new(inventory)),
            ServiceHandle::Shipping(Arc::new(InMemoryShippingService::new())),
        ];
        for handle in handles {
            let name = handle.kind().name();
            let address = format!("mem://{name}");
            network.bind(address.clone(), handle).await;
            registry
                .register(name, &address, Duration::from_secs(3600))
                .await
                .unwrap();
        }

        let (log, _task) = LogPublisher::spawn(Arc::new(TracingLogSink), 1024);
        let resolver = RegistryResolver::new(registry, network);
        Orchestrator::new(Arc::new(resolver), log, OrchestratorConfig::default())
    });

    c.bench_function("scenario_in_stock", |b| {
        b.to_async(&rt).iter(|| async {
            orchestrator.run_scenario("in-stock").await.unwrap();
        });
    });
}

criterion_group!(benches, bench_forward_path, bench_in_stock_scenario);
criterion_main!(benches);
