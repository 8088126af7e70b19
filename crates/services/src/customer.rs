//! Customer service: customer identity records.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::CustomerId;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{Result, ServiceError};

/// A customer record. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub address: String,
}

/// Remote surface of the customer service.
#[async_trait]
pub trait CustomerService: Send + Sync {
    /// Registers a new customer and assigns its ID.
    async fn create(&self, name: &str, address: &str) -> Result<Customer>;

    /// Returns the customer with the given ID.
    async fn get(&self, id: CustomerId) -> Result<Customer>;
}

#[derive(Debug, Default)]
struct InMemoryCustomerState {
    customers: HashMap<CustomerId, Customer>,
    last_id: u32,
}

/// In-memory customer service.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCustomerService {
    state: Arc<RwLock<InMemoryCustomerState>>,
}

impl InMemoryCustomerService {
    /// Creates a new in-memory customer service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of registered customers.
    pub async fn customer_count(&self) -> usize {
        self.state.read().await.customers.len()
    }
}

#[async_trait]
impl CustomerService for InMemoryCustomerService {
    async fn create(&self, name: &str, address: &str) -> Result<Customer> {
        let mut state = self.state.write().await;
        state.last_id += 1;
        let customer = Customer {
            id: CustomerId::new(state.last_id),
            name: name.to_string(),
            address: address.to_string(),
        };
        state.customers.insert(customer.id, customer.clone());

        tracing::info!(customer_id = %customer.id, name, address, "created customer");
        Ok(customer)
    }

    async fn get(&self, id: CustomerId) -> Result<Customer> {
        self.state
            .read()
            .await
            .customers
            .get(&id)
            .cloned()
            .ok_or_else(|| ServiceError::not_found("Customer", id))
    }
}
