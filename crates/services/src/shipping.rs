//! Shipping service: shipments and dispatch confirmation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{OrderId, StockItem};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{Result, ServiceError};

/// Result of a successful shipment creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentResult {
    /// The tracking number assigned by the shipping service.
    pub tracking_number: String,
}

/// Lifecycle of a shipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShipmentStatus {
    /// Booked, not yet handed to the carrier.
    Created,
    /// Handed to the carrier.
    Dispatched,
    /// Withdrawn before dispatch.
    Cancelled,
}

/// A shipment of some or all of an order's items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipment {
    pub tracking_number: String,
    pub order_id: OrderId,
    pub items: Vec<StockItem>,
    pub status: ShipmentStatus,
}

/// Remote surface of the shipping service.
#[async_trait]
pub trait ShippingService: Send + Sync {
    /// Books a shipment for the given items of an order.
    async fn create_shipment(
        &self,
        order_id: OrderId,
        items: Vec<StockItem>,
    ) -> Result<ShipmentResult>;

    /// Marks a shipment as handed to the carrier.
    async fn confirm_dispatch(&self, tracking_number: &str) -> Result<Shipment>;

    /// Withdraws a shipment that has not been dispatched.
    ///
    /// Cancelling a cancelled shipment succeeds without change.
    async fn cancel_shipment(&self, tracking_number: &str) -> Result<Shipment>;

    /// Returns the shipment with the given tracking number.
    async fn get_shipment(&self, tracking_number: &str) -> Result<Shipment>;
}

#[derive(Debug, Default)]
struct InMemoryShippingState {
    shipments: HashMap<String, Shipment>,
    next_id: u32,
    fail_on_create: bool,
    fail_on_dispatch: bool,
}

/// In-memory shipping service.
#[derive(Debug, Clone, Default)]
pub struct InMemoryShippingService {
    state: Arc<RwLock<InMemoryShippingState>>,
}

impl InMemoryShippingService {
    /// Creates a new in-memory shipping service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the service to fail on the next create_shipment call.
    pub async fn set_fail_on_create(&self, fail: bool) {
        self.state.write().await.fail_on_create = fail;
    }

    /// Configures the service to fail every confirm_dispatch call.
    pub async fn set_fail_on_dispatch(&self, fail: bool) {
        self.state.write().await.fail_on_dispatch = fail;
    }

    /// Returns the number of shipments.
    pub async fn shipment_count(&self) -> usize {
        self.state.read().await.shipments.len()
    }

    /// Returns every shipment booked for `order_id`, oldest first.
    pub async fn shipments_for_order(&self, order_id: OrderId) -> Vec<Shipment> {
        let state = self.state.read().await;
        let mut shipments: Vec<Shipment> = state
            .shipments
            .values()
            .filter(|s| s.order_id == order_id)
            .cloned()
            .collect();
        shipments.sort_by(|a, b| a.tracking_number.cmp(&b.tracking_number));
        shipments
    }
}

#[async_trait]
impl ShippingService for InMemoryShippingService {
    async fn create_shipment(
        &self,
        order_id: OrderId,
        items: Vec<StockItem>,
    ) -> Result<ShipmentResult> {
        let mut state = self.state.write().await;

        if state.fail_on_create {
            return Err(ServiceError::Unavailable {
                service: "shipping",
                reason: "carrier unavailable".to_string(),
            });
        }

        state.next_id += 1;
        let tracking_number = format!("TRACK-{:04}", state.next_id);
        state.shipments.insert(
            tracking_number.clone(),
            Shipment {
                tracking_number: tracking_number.clone(),
                order_id,
                items,
                status: ShipmentStatus::Created,
            },
        );

        tracing::info!(%order_id, %tracking_number, "created shipment");
        Ok(ShipmentResult { tracking_number })
    }

    async fn confirm_dispatch(&self, tracking_number: &str) -> Result<Shipment> {
        let mut state = self.state.write().await;

        if state.fail_on_dispatch {
            return Err(ServiceError::Unavailable {
                service: "shipping",
                reason: "carrier did not collect".to_string(),
            });
        }

        let shipment = state
            .shipments
            .get_mut(tracking_number)
            .ok_or_else(|| ServiceError::not_found("Shipment", tracking_number))?;

        if shipment.status == ShipmentStatus::Cancelled {
            return Err(ServiceError::not_found("Shipment", tracking_number));
        }

        shipment.status = ShipmentStatus::Dispatched;
        tracing::info!(tracking_number, "dispatched shipment");
        Ok(shipment.clone())
    }

    async fn cancel_shipment(&self, tracking_number: &str) -> Result<Shipment> {
        let mut state = self.state.write().await;
        let shipment = state
            .shipments
            .get_mut(tracking_number)
            .ok_or_else(|| ServiceError::not_found("Shipment", tracking_number))?;

        match shipment.status {
            ShipmentStatus::Dispatched => {
                return Err(ServiceError::AlreadyDispatched {
                    tracking_number: tracking_number.to_string(),
                });
            }
            ShipmentStatus::Created => {
                shipment.status = ShipmentStatus::Cancelled;
                tracing::info!(tracking_number, "cancelled shipment");
            }
            ShipmentStatus::Cancelled => {}
        }
        Ok(shipment.clone())
    }

    async fn get_shipment(&self, tracking_number: &str) -> Result<Shipment> {
        self.state
            .read()
            .await
            .shipments
            .get(tracking_number)
            .cloned()
            .ok_or_else(|| ServiceError::not_found("Shipment", tracking_number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_dispatch_shipment() {
        let service = InMemoryShippingService::new();
        let order_id = OrderId::new(1);

        let result = service
            .create_shipment(order_id, vec![StockItem::new("SKU-001", 1)])
            .await
            .unwrap();
        assert!(result.tracking_number.starts_with("TRACK-"));

        let shipment = service.get_shipment(&result.tracking_number).await.unwrap();
        assert_eq!(shipment.status, ShipmentStatus::Created);

        let shipment = service
            .confirm_dispatch(&result.tracking_number)
            .await
            .unwrap();
        assert_eq!(shipment.status, ShipmentStatus::Dispatched);
        assert_eq!(service.shipments_for_order(order_id).await.len(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_unknown_is_not_found() {
        let service = InMemoryShippingService::new();
        let result = service.confirm_dispatch("TRACK-9999").await;
        assert!(matches!(result, Err(ServiceError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_cancel_undispatched_shipment() {
        let service = InMemoryShippingService::new();
        let result = service
            .create_shipment(OrderId::new(1), vec![StockItem::new("SKU-001", 1)])
            .await
            .unwrap();

        let shipment = service.cancel_shipment(&result.tracking_number).await.unwrap();
        assert_eq!(shipment.status, ShipmentStatus::Cancelled);

        // Repeating the cancel is harmless; dispatching it is not possible.
        let shipment = service.cancel_shipment(&result.tracking_number).await.unwrap();
        assert_eq!(shipment.status, ShipmentStatus::Cancelled);
        let dispatched = service.confirm_dispatch(&result.tracking_number).await;
        assert!(matches!(dispatched, Err(ServiceError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_cancel_dispatched_shipment_is_rejected() {
        let service = InMemoryShippingService::new();
        let result = service
            .create_shipment(OrderId::new(1), vec![StockItem::new("SKU-001", 1)])
            .await
            .unwrap();
        service.confirm_dispatch(&result.tracking_number).await.unwrap();

        let cancelled = service.cancel_shipment(&result.tracking_number).await;
        assert!(matches!(cancelled, Err(ServiceError::AlreadyDispatched { .. })));

        let shipment = service.get_shipment(&result.tracking_number).await.unwrap();
        assert_eq!(shipment.status, ShipmentStatus::Dispatched);
    }

    #[tokio::test]
    async fn test_fail_on_dispatch_leaves_shipment_booked() {
        let service = InMemoryShippingService::new();
        service.set_fail_on_dispatch(true).await;
        let result = service
            .create_shipment(OrderId::new(1), vec![StockItem::new("SKU-001", 1)])
            .await
            .unwrap();

        let dispatched = service.confirm_dispatch(&result.tracking_number).await;
        assert!(matches!(dispatched, Err(ServiceError::Unavailable { .. })));

        let shipment = service.get_shipment(&result.tracking_number).await.unwrap();
        assert_eq!(shipment.status, ShipmentStatus::Created);
    }

    #[tokio::test]
    async fn test_fail_on_create() {
        let service = InMemoryShippingService::new();
        service.set_fail_on_create(true).await;

        let result = service.create_shipment(OrderId::new(1), vec![]).await;
        assert!(result.is_err());
        assert_eq!(service.shipment_count().await, 0);
    }

    #[tokio::test]
    async fn test_sequential_tracking_numbers() {
        let service = InMemoryShippingService::new();
        let order_id = OrderId::new(1);

        let r1 = service.create_shipment(order_id, vec![]).await.unwrap();
        let r2 = service.create_shipment(order_id, vec![]).await.unwrap();

        assert_eq!(r1.tracking_number, "TRACK-0001");
        assert_eq!(r2.tracking_number, "TRACK-0002");
    }
}
