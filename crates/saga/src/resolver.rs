//! Locating a live instance of each domain service.

use std::sync::Arc;

use async_trait::async_trait;
use registry::RegistryClient;
use services::{
    CustomerService, InventoryService, LocalNetwork, PaymentService, ServiceKind, ShippingService,
};

use crate::error::StepError;

/// Hands out connections to domain services.
///
/// The orchestrator asks once per saga step and never keeps a connection
/// across steps, so a restarted service is picked up on the next step.
#[async_trait]
pub trait ServiceResolver: Send + Sync {
    async fn customer(&self) -> Result<Arc<dyn CustomerService>, StepError>;
    async fn payment(&self) -> Result<Arc<dyn PaymentService>, StepError>;
    async fn inventory(&self) -> Result<Arc<dyn InventoryService>, StepError>;
    async fn shipping(&self) -> Result<Arc<dyn ShippingService>, StepError>;
}

/// Resolves service names through the registry and dials the address found.
#[derive(Debug, Clone)]
pub struct RegistryResolver {
    registry: RegistryClient,
    network: LocalNetwork,
}

impl RegistryResolver {
    pub fn new(registry: RegistryClient, network: LocalNetwork) -> Self {
        Self { registry, network }
    }

    async fn address(&self, kind: ServiceKind) -> Result<String, StepError> {
        let address = self.registry.resolve(kind.name()).await?;
        tracing::debug!(service = %kind, %address, "resolved service");
        Ok(address)
    }
}

#[async_trait]
impl ServiceResolver for RegistryResolver {
    async fn customer(&self) -> Result<Arc<dyn CustomerService>, StepError> {
        let address = self.address(ServiceKind::Customer).await?;
        Ok(self.network.dial_customer(&address).await?)
    }

    async fn payment(&self) -> Result<Arc<dyn PaymentService>, StepError> {
        let address = self.address(ServiceKind::Payment).await?;
        Ok(self.network.dial_payment(&address).await?)
    }

    async fn inventory(&self) -> Result<Arc<dyn InventoryService>, StepError> {
        let address = self.address(ServiceKind::Inventory).await?;
        Ok(self.network.dial_inventory(&address).await?)
    }

    async fn shipping(&self) -> Result<Arc<dyn ShippingService>, StepError> {
        let address = self.address(ServiceKind::Shipping).await?;
        Ok(self.network.dial_shipping(&address).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use registry::{InMemoryDirectory, RegistryError};
    use services::{InMemoryPaymentService, ServiceError, ServiceHandle};

    use super::*;

    fn resolver() -> (RegistryResolver, RegistryClient, LocalNetwork) {
        let registry = RegistryClient::new(Arc::new(InMemoryDirectory::new()));
        let network = LocalNetwork::new();
        let resolver = RegistryResolver::new(registry.clone(), network.clone());
        (resolver, registry, network)
    }

    #[tokio::test]
    async fn test_resolves_registered_service() {
        let (resolver, registry, network) = resolver();
        network
            .bind(
                "mem://payment-1",
                ServiceHandle::Payment(Arc::new(InMemoryPaymentService::new())),
            )
            .await;
        registry
            .register("payment", "mem://payment-1", Duration::from_secs(13))
            .await
            .unwrap();

        assert!(resolver.payment().await.is_ok());
    }

    #[tokio::test]
    async fn test_unregistered_service_is_unavailable() {
        let (resolver, _, _) = resolver();
        let result = resolver.shipping().await;
        assert!(matches!(
            result,
            Err(StepError::Registry(RegistryError::ServiceUnavailable { .. }))
        ));
    }

    #[tokio::test]
    async fn test_stale_address_is_refused() {
        let (resolver, registry, _) = resolver();
        registry
            .register("customer", "mem://gone", Duration::from_secs(13))
            .await
            .unwrap();

        let result = resolver.customer().await;
        assert!(matches!(
            result,
            Err(StepError::Service(ServiceError::ConnectionRefused { .. }))
        ));
    }

    #[tokio::test]
    async fn test_wrong_service_at_address() {
        let (resolver, registry, network) = resolver();
        network
            .bind(
                "mem://payment-1",
                ServiceHandle::Payment(Arc::new(InMemoryPaymentService::new())),
            )
            .await;
        registry
            .register("inventory", "mem://payment-1", Duration::from_secs(13))
            .await
            .unwrap();

        let result = resolver.inventory().await;
        assert!(matches!(
            result,
            Err(StepError::Service(ServiceError::WrongService { .. }))
        ));
    }
}
