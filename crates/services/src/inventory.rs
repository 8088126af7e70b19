//! Inventory service: stock levels, reservations and supplier deliveries.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{OrderId, ProductId, StockItem};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{Result, ServiceError};

/// Result of a successful inventory reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationResult {
    /// The reservation ID assigned by the inventory service.
    pub reservation_id: String,
}

/// Stock arriving from a supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierDelivery {
    pub product_id: ProductId,
    pub quantity: u32,
    pub supplier: String,
}

impl SupplierDelivery {
    /// Creates a new delivery.
    pub fn new(product_id: impl Into<ProductId>, quantity: u32, supplier: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            supplier: supplier.into(),
        }
    }
}

/// Remote surface of the inventory service.
#[async_trait]
pub trait InventoryService: Send + Sync {
    /// Returns the products that cannot currently be reserved in full.
    async fn check_availability(&self, items: &[StockItem]) -> Result<Vec<ProductId>>;

    /// Reserves every item or none of them.
    async fn reserve(&self, order_id: OrderId, items: Vec<StockItem>) -> Result<ReservationResult>;

    /// Releases a reservation, returning its stock.
    async fn release(&self, reservation_id: &str) -> Result<()>;

    /// Books a supplier delivery into stock, returning the new level.
    async fn receive_delivery(&self, delivery: SupplierDelivery) -> Result<u32>;
}

#[derive(Debug, Default)]
struct InMemoryInventoryState {
    stock: HashMap<ProductId, u32>,
    reservations: HashMap<String, (OrderId, Vec<StockItem>)>,
    next_id: u32,
    fail_on_reserve: bool,
}

impl InMemoryInventoryState {
    fn available(&self, product_id: &ProductId) -> u32 {
        self.stock.get(product_id).copied().unwrap_or(0)
    }

    /// Quantities per product, so repeated lines for one product add up.
    fn demand(items: &[StockItem]) -> HashMap<&ProductId, u32> {
        let mut demand = HashMap::new();
        for item in items {
            *demand.entry(&item.product_id).or_insert(0) += item.quantity;
        }
        demand
    }
}

/// In-memory inventory service.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventoryService {
    state: Arc<RwLock<InMemoryInventoryState>>,
}

impl InMemoryInventoryService {
    /// Creates an inventory with no stock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the stock level of a product.
    pub async fn set_stock(&self, product_id: impl Into<ProductId>, quantity: u32) {
        self.state
            .write()
            .await
            .stock
            .insert(product_id.into(), quantity);
    }

    /// Returns the unreserved stock of a product.
    pub async fn stock_level(&self, product_id: &ProductId) -> u32 {
        self.state.read().await.available(product_id)
    }

    /// Configures the service to fail on the next reserve call.
    pub async fn set_fail_on_reserve(&self, fail: bool) {
        self.state.write().await.fail_on_reserve = fail;
    }

    /// Returns the number of active reservations.
    pub async fn reservation_count(&self) -> usize {
        self.state.read().await.reservations.len()
    }

    /// Returns true if a reservation exists with the given ID.
    pub async fn has_reservation(&self, reservation_id: &str) -> bool {
        self.state
            .read()
            .await
            .reservations
            .contains_key(reservation_id)
    }
}

#[async_trait]
impl InventoryService for InMemoryInventoryService {
    async fn check_availability(&self, items: &[StockItem]) -> Result<Vec<ProductId>> {
        let state = self.state.read().await;
        let mut missing: Vec<ProductId> = InMemoryInventoryState::demand(items)
            .into_iter()
            .filter(|(product_id, wanted)| state.available(product_id) < *wanted)
            .map(|(product_id, _)| product_id.clone())
            .collect();
        missing.sort();
        Ok(missing)
    }

    #[tracing::instrument(skip(self, items), fields(items = items.len()))]
    async fn reserve(&self, order_id: OrderId, items: Vec<StockItem>) -> Result<ReservationResult> {
        let mut state = self.state.write().await;

        if state.fail_on_reserve {
            return Err(ServiceError::Unavailable {
                service: "inventory",
                reason: "reservations suspended".to_string(),
            });
        }

        let demand: Vec<(ProductId, u32)> = InMemoryInventoryState::demand(&items)
            .into_iter()
            .map(|(product_id, wanted)| (product_id.clone(), wanted))
            .collect();

        for (product_id, wanted) in &demand {
            let available = state.available(product_id);
            if available < *wanted {
                return Err(ServiceError::OutOfStock {
                    product_id: product_id.clone(),
                    requested: *wanted,
                    available,
                });
            }
        }
        for (product_id, wanted) in demand {
            if let Some(level) = state.stock.get_mut(&product_id) {
                *level -= wanted;
            }
        }

        state.next_id += 1;
        let reservation_id = format!("RES-{:04}", state.next_id);
        state
            .reservations
            .insert(reservation_id.clone(), (order_id, items));

        tracing::info!(%order_id, %reservation_id, "reserved stock");
        Ok(ReservationResult { reservation_id })
    }

    async fn release(&self, reservation_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let (order_id, items) = state
            .reservations
            .get(reservation_id)
            .cloned()
            .ok_or_else(|| ServiceError::not_found("Reservation", reservation_id))?;

        // All-or-nothing: compute every new level before touching stock.
        let mut levels: HashMap<ProductId, u32> = HashMap::new();
        for item in &items {
            let level = levels
                .get(&item.product_id)
                .or_else(|| state.stock.get(&item.product_id))
                .copied()
                .unwrap_or(0);
            let restored = level
                .checked_add(item.quantity)
                .ok_or_else(|| ServiceError::StockOverflow {
                    product_id: item.product_id.clone(),
                    level,
                    quantity: item.quantity,
                })?;
            levels.insert(item.product_id.clone(), restored);
        }

        state.reservations.remove(reservation_id);
        state.stock.extend(levels);

        tracing::info!(%order_id, reservation_id, "released stock");
        Ok(())
    }

    async fn receive_delivery(&self, delivery: SupplierDelivery) -> Result<u32> {
        let mut state = self.state.write().await;
        let current = state.stock.get(&delivery.product_id).copied().unwrap_or(0);
        let level = current
            .checked_add(delivery.quantity)
            .ok_or_else(|| ServiceError::StockOverflow {
                product_id: delivery.product_id.clone(),
                level: current,
                quantity: delivery.quantity,
            })?;
        state.stock.insert(delivery.product_id.clone(), level);

        tracing::info!(
            product_id = %delivery.product_id,
            supplier = %delivery.supplier,
            quantity = delivery.quantity,
            level,
            "received supplier delivery"
        );
        Ok(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn stocked() -> InMemoryInventoryService {
        let service = InMemoryInventoryService::new();
        service.set_stock("SKU-001", 5).await;
        service.set_stock("SKU-002", 1).await;
        service
    }

    #[tokio::test]
    async fn test_reserve_and_release() {
        let service = stocked().await;
        let order_id = OrderId::new(1);
        let items = vec![StockItem::new("SKU-001", 2), StockItem::new("SKU-002", 1)];

        let result = service.reserve(order_id, items).await.unwrap();
        assert!(result.reservation_id.starts_with("RES-"));
        assert_eq!(service.reservation_count().await, 1);
        assert_eq!(service.stock_level(&"SKU-001".into()).await, 3);
        assert_eq!(service.stock_level(&"SKU-002".into()).await, 0);

        service.release(&result.reservation_id).await.unwrap();
        assert_eq!(service.reservation_count().await, 0);
        assert_eq!(service.stock_level(&"SKU-001".into()).await, 5);
        assert_eq!(service.stock_level(&"SKU-002".into()).await, 1);
    }

    #[tokio::test]
    async fn test_reserve_is_all_or_nothing() {
        let service = stocked().await;
        let items = vec![StockItem::new("SKU-001", 2), StockItem::new("SKU-003", 1)];

        let result = service.reserve(OrderId::new(1), items).await;
        assert!(matches!(
            result,
            Err(ServiceError::OutOfStock { ref product_id, .. }) if product_id.as_str() == "SKU-003"
        ));
        assert_eq!(service.stock_level(&"SKU-001".into()).await, 5);
        assert_eq!(service.reservation_count().await, 0);
    }

    #[tokio::test]
    async fn test_repeated_lines_add_up() {
        let service = stocked().await;
        let items = vec![StockItem::new("SKU-002", 1), StockItem::new("SKU-002", 1)];

        let missing = service.check_availability(&items).await.unwrap();
        assert_eq!(missing, vec![ProductId::new("SKU-002")]);
        assert!(service.reserve(OrderId::new(1), items).await.is_err());
    }

    #[tokio::test]
    async fn test_check_availability_lists_missing() {
        let service = stocked().await;
        let items = vec![
            StockItem::new("SKU-003", 1),
            StockItem::new("SKU-001", 1),
            StockItem::new("SKU-004", 2),
        ];

        let missing = service.check_availability(&items).await.unwrap();
        assert_eq!(missing, vec![ProductId::new("SKU-003"), ProductId::new("SKU-004")]);
    }

    #[tokio::test]
    async fn test_delivery_makes_stock_available() {
        let service = stocked().await;
        let items = vec![StockItem::new("SKU-003", 1)];
        assert_eq!(service.check_availability(&items).await.unwrap().len(), 1);

        let level = service
            .receive_delivery(SupplierDelivery::new("SKU-003", 4, "Supplier A"))
            .await
            .unwrap();
        assert_eq!(level, 4);
        assert!(service.check_availability(&items).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delivery_overflow_is_rejected() {
        let service = stocked().await;
        let level = service
            .receive_delivery(SupplierDelivery::new("SKU-003", u32::MAX, "Supplier A"))
            .await
            .unwrap();
        assert_eq!(level, u32::MAX);

        let result = service
            .receive_delivery(SupplierDelivery::new("SKU-003", 1, "Supplier B"))
            .await;
        assert!(matches!(result, Err(ServiceError::StockOverflow { level, quantity: 1, .. }) if level == u32::MAX));
        assert_eq!(service.stock_level(&"SKU-003".into()).await, u32::MAX);
    }

    #[tokio::test]
    async fn test_release_overflow_keeps_reservation() {
        let service = stocked().await;
        let result = service
            .reserve(OrderId::new(1), vec![StockItem::new("SKU-001", 2)])
            .await
            .unwrap();
        service
            .receive_delivery(SupplierDelivery::new("SKU-001", u32::MAX - 3, "Supplier A"))
            .await
            .unwrap();

        let released = service.release(&result.reservation_id).await;
        assert!(matches!(released, Err(ServiceError::StockOverflow { .. })));
        assert_eq!(service.reservation_count().await, 1);
        assert_eq!(service.stock_level(&"SKU-001".into()).await, u32::MAX);
    }

    #[tokio::test]
    async fn test_release_unknown_is_not_found() {
        let service = stocked().await;
        let result = service.release("RES-9999").await;
        assert!(matches!(result, Err(ServiceError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_fail_on_reserve() {
        let service = stocked().await;
        service.set_fail_on_reserve(true).await;

        let result = service
            .reserve(OrderId::new(1), vec![StockItem::new("SKU-001", 1)])
            .await;
        assert!(matches!(result, Err(ServiceError::Unavailable { .. })));
        assert_eq!(service.reservation_count().await, 0);
    }

    #[tokio::test]
    async fn test_sequential_reservation_ids() {
        let service = stocked().await;
        let order_id = OrderId::new(1);

        let r1 = service.reserve(order_id, vec![]).await.unwrap();
        let r2 = service.reserve(order_id, vec![]).await.unwrap();

        assert_eq!(r1.reservation_id, "RES-0001");
        assert_eq!(r2.reservation_id, "RES-0002");
    }
}
