//! Lease lifecycle tests driven by the paused tokio clock.

use std::sync::Arc;
use std::time::Duration;

use registry::{Heartbeat, InMemoryDirectory, LeaseConfig, RegistryClient, RegistryError};

fn setup() -> (InMemoryDirectory, RegistryClient) {
    let directory = InMemoryDirectory::new();
    let client = RegistryClient::new(Arc::new(directory.clone()));
    (directory, client)
}

#[tokio::test(start_paused = true)]
async fn test_service_is_resolvable_once_started() {
    let (_, client) = setup();
    let _heartbeat = Heartbeat::start(
        client.clone(),
        "payment",
        "10.0.0.5:50056",
        LeaseConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(client.resolve("payment").await.unwrap(), "10.0.0.5:50056");
}

#[tokio::test(start_paused = true)]
async fn test_heartbeat_keeps_service_resolvable() {
    let (_, client) = setup();
    let heartbeat = Heartbeat::start(
        client.clone(),
        "payment",
        "10.0.0.5:50056",
        LeaseConfig::default(),
    )
    .await
    .unwrap();

    // Several lease lifetimes later the entry is still live.
    for _ in 0..6 {
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(client.resolve("payment").await.unwrap(), "10.0.0.5:50056");
    }

    assert_eq!(heartbeat.name(), "payment");
    assert!(!heartbeat.is_finished());
}

#[tokio::test(start_paused = true)]
async fn test_lease_lapses_after_heartbeat_stops() {
    let (_, client) = setup();
    let heartbeat = Heartbeat::start(
        client.clone(),
        "payment",
        "10.0.0.5:50056",
        LeaseConfig::default(),
    )
    .await
    .unwrap();
    assert!(client.resolve("payment").await.is_ok());

    heartbeat.stop();
    tokio::time::sleep(Duration::from_secs(13)).await;

    let result = client.resolve("payment").await;
    assert!(matches!(result, Err(RegistryError::ServiceUnavailable { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_restarted_instance_replaces_address() {
    let (_, client) = setup();
    let lease = LeaseConfig::default();

    let first = Heartbeat::start(client.clone(), "shipping", "10.0.0.7:50057", lease)
        .await
        .unwrap();
    first.stop();

    let _second = Heartbeat::start(client.clone(), "shipping", "10.0.0.8:50057", lease)
        .await
        .unwrap();

    assert_eq!(client.resolve("shipping").await.unwrap(), "10.0.0.8:50057");
}

#[tokio::test(start_paused = true)]
async fn test_failed_first_registration_is_returned() {
    let (directory, client) = setup();
    directory.set_fail_on_set(true).await;

    let result = Heartbeat::start(
        client.clone(),
        "inventory",
        "10.0.0.6:50055",
        LeaseConfig::default(),
    )
    .await;

    assert!(matches!(result, Err(RegistryError::Directory(_))));
    assert!(client.resolve("inventory").await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_zero_refresh_is_rejected() {
    let (_, client) = setup();
    let lease = LeaseConfig {
        ttl: Duration::from_secs(13),
        refresh: Duration::ZERO,
    };

    let result = Heartbeat::start(client, "inventory", "10.0.0.6:50055", lease).await;
    assert!(matches!(result, Err(RegistryError::InvalidLease { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_failed_refresh_is_retried() {
    let (directory, client) = setup();
    let heartbeat = Heartbeat::start(
        client.clone(),
        "inventory",
        "10.0.0.6:50055",
        LeaseConfig::default(),
    )
    .await
    .unwrap();

    // The refresh at 10s fails, so the lease lapses at 13s.
    directory.set_fail_on_set(true).await;
    tokio::time::sleep(Duration::from_secs(14)).await;
    assert!(client.resolve("inventory").await.is_err());

    // The next tick at 20s succeeds again.
    directory.set_fail_on_set(false).await;
    tokio::time::sleep(Duration::from_secs(7)).await;

    assert_eq!(client.resolve("inventory").await.unwrap(), "10.0.0.6:50055");
    assert!(!heartbeat.is_finished());
}
