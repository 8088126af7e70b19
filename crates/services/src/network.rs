//! In-process transport between the orchestrator and the domain services.
//!
//! Services bind a handle at an address; callers dial an address they learned
//! from the registry. Nothing here knows service names, only addresses.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::customer::CustomerService;
use crate::error::{Result, ServiceError};
use crate::inventory::InventoryService;
use crate::payment::PaymentService;
use crate::shipping::ShippingService;

/// The kinds of domain service, with their registry names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    Customer,
    Payment,
    Inventory,
    Shipping,
}

impl ServiceKind {
    /// The name the service registers under.
    pub fn name(&self) -> &'static str {
        match self {
            ServiceKind::Customer => "customer",
            ServiceKind::Payment => "payment",
            ServiceKind::Inventory => "inventory",
            ServiceKind::Shipping => "shipping",
        }
    }
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A connection to one service instance.
#[derive(Clone)]
pub enum ServiceHandle {
    Customer(Arc<dyn CustomerService>),
    Payment(Arc<dyn PaymentService>),
    Inventory(Arc<dyn InventoryService>),
    Shipping(Arc<dyn ShippingService>),
}

impl ServiceHandle {
    /// The kind of service behind this handle.
    pub fn kind(&self) -> ServiceKind {
        match self {
            ServiceHandle::Customer(_) => ServiceKind::Customer,
            ServiceHandle::Payment(_) => ServiceKind::Payment,
            ServiceHandle::Inventory(_) => ServiceKind::Inventory,
            ServiceHandle::Shipping(_) => ServiceKind::Shipping,
        }
    }
}

impl std::fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ServiceHandle").field(&self.kind()).finish()
    }
}

/// Address table standing in for the RPC transport.
#[derive(Debug, Clone, Default)]
pub struct LocalNetwork {
    endpoints: Arc<RwLock<HashMap<String, ServiceHandle>>>,
}

macro_rules! typed_dial {
    ($fn_name:ident, $variant:ident, $service:ident) => {
        /// Dials `address`, expecting the matching service kind.
        pub async fn $fn_name(&self, address: &str) -> Result<Arc<dyn $service>> {
            match self.dial(address).await? {
                ServiceHandle::$variant(service) => Ok(service),
                other => Err(ServiceError::WrongService {
                    address: address.to_string(),
                    expected: ServiceKind::$variant.name(),
                    actual: other.kind().name(),
                }),
            }
        }
    };
}

impl LocalNetwork {
    /// Creates an empty network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts serving `handle` at `address`, replacing any previous listener.
    pub async fn bind(&self, address: impl Into<String>, handle: ServiceHandle) {
        self.endpoints.write().await.insert(address.into(), handle);
    }

    /// Stops serving at `address`.
    pub async fn unbind(&self, address: &str) -> Option<ServiceHandle> {
        self.endpoints.write().await.remove(address)
    }

    /// Connects to whatever is serving at `address`.
    pub async fn dial(&self, address: &str) -> Result<ServiceHandle> {
        self.endpoints
            .read()
            .await
            .get(address)
            .cloned()
            .ok_or_else(|| ServiceError::ConnectionRefused {
                address: address.to_string(),
            })
    }

    typed_dial!(dial_customer, Customer, CustomerService);
    typed_dial!(dial_payment, Payment, PaymentService);
    typed_dial!(dial_inventory, Inventory, InventoryService);
    typed_dial!(dial_shipping, Shipping, ShippingService);
}
