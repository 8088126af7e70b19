//! Benchmarks for the payment service hot path.

use common::{Money, OrderId};
use criterion::{Criterion, criterion_group, criterion_main};
use services::{InMemoryPaymentService, PaymentService};

fn bench_create_and_pay(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let service = InMemoryPaymentService::new();

    c.bench_function("payment_create_pay", |b| {
        b.to_async(&rt).iter(|| async {
            let payment = service
                .create(OrderId::new(1), Money::from_cents(3398))
                .await
                .unwrap();
            service.pay(payment.id, payment.value).await.unwrap();
        });
    });
}

fn bench_refund(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let service = InMemoryPaymentService::new();
    let payment = rt.block_on(async {
        let payment = service
            .create(OrderId::new(1), Money::from_cents(i64::MAX / 2))
            .await
            .unwrap();
        service.pay(payment.id, payment.value).await.unwrap()
    });

    c.bench_function("payment_refund", |b| {
        b.to_async(&rt).iter(|| async {
            service.refund(payment.id, Money::from_cents(1)).await.unwrap();
        });
    });
}

criterion_group!(benches, bench_create_and_pay, bench_refund);
criterion_main!(benches);
