//! Saga driver for order fulfillment.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use common::{CustomerId, Money, OrderId, OrderItem, PaymentId, ProductId, StockItem};
use log_bus::LogPublisher;
use registry::client::DEFAULT_CALL_TIMEOUT;
use services::{Customer, Payment, ServiceError, SupplierDelivery};
use tokio::sync::{Mutex, RwLock};

use crate::error::{Result, SagaError, StepError};
use crate::events::{Effect, OrderEvent, ReturnResolution, StockArrival};
use crate::order::OrderSaga;
use crate::order_fulfillment::*;
use crate::resolver::ServiceResolver;
use crate::transition::transition;

/// Delays after which the two simulated suppliers deliver.
pub const DEFAULT_SUPPLIER_DELAYS: [Duration; 2] =
    [Duration::from_millis(50), Duration::from_millis(120)];

/// Orchestrator settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Upper bound on every domain service call.
    pub call_timeout: Duration,
    /// When the suppliers of the partial-stock scenario deliver.
    pub supplier_delays: [Duration; 2],
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            call_timeout: DEFAULT_CALL_TIMEOUT,
            supplier_delays: DEFAULT_SUPPLIER_DELAYS,
        }
    }
}

type OrderBook = Arc<RwLock<HashMap<OrderId, Arc<Mutex<OrderSaga>>>>>;

/// Drives orders through the fulfillment saga.
///
/// The orchestrator owns the saga state of every order it has placed. Each
/// order sits behind its own mutex, so notifications for one order are
/// processed one at a time in arrival order while different orders proceed
/// concurrently. Domain services are resolved afresh for every step.
///
/// A failing step aborts the operation and is reported as
/// [`SagaError::StepFailed`]; nothing is rolled back implicitly. Compensation
/// happens only on the explicit cancel and return paths.
#[derive(Clone)]
pub struct Orchestrator {
    resolver: Arc<dyn ServiceResolver>,
    log: LogPublisher,
    config: OrchestratorConfig,
    orders: OrderBook,
    last_order_id: Arc<AtomicU32>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Creates a new orchestrator.
    pub fn new(
        resolver: Arc<dyn ServiceResolver>,
        log: LogPublisher,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            resolver,
            log,
            config,
            orders: Arc::default(),
            last_order_id: Arc::default(),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub(crate) fn log(&self) -> &LogPublisher {
        &self.log
    }

    pub(crate) fn resolver(&self) -> &dyn ServiceResolver {
        self.resolver.as_ref()
    }

    /// Registers a new customer.
    #[tracing::instrument(skip(self))]
    pub async fn create_customer(&self, name: &str, address: &str) -> Result<Customer> {
        let customers = self
            .connect(STEP_CREATE_CUSTOMER, self.resolver.customer())
            .await?;
        let customer = self
            .call(STEP_CREATE_CUSTOMER, customers.create(name, address))
            .await?;
        tracing::info!(customer_id = %customer.id, "customer created");
        Ok(customer)
    }

    /// Looks up a customer.
    #[tracing::instrument(skip(self))]
    pub async fn get_customer(&self, id: CustomerId) -> Result<Customer> {
        let customers = self
            .connect(STEP_GET_CUSTOMER, self.resolver.customer())
            .await?;
        self.call(STEP_GET_CUSTOMER, customers.get(id)).await
    }

    /// Looks up a payment.
    #[tracing::instrument(skip(self))]
    pub async fn get_payment(&self, id: PaymentId) -> Result<Payment> {
        let payments = self
            .connect(STEP_GET_PAYMENT, self.resolver.payment())
            .await?;
        self.call(STEP_GET_PAYMENT, payments.get(id)).await
    }

    /// Books a supplier delivery into stock, returning the new stock level.
    #[tracing::instrument(
        skip(self, delivery),
        fields(product_id = %delivery.product_id, quantity = delivery.quantity)
    )]
    pub async fn book_delivery(&self, delivery: SupplierDelivery) -> Result<u32> {
        let inventory = self
            .connect(STEP_RECEIVE_DELIVERY, self.resolver.inventory())
            .await?;
        self.call(STEP_RECEIVE_DELIVERY, inventory.receive_delivery(delivery))
            .await
    }

    /// Places an order and tries to reserve its stock.
    ///
    /// Returns the order in `PaymentPending` when everything was in stock, or
    /// in `AwaitingStock` with the missing products recorded.
    #[tracing::instrument(skip(self, items), fields(items = items.len()))]
    pub async fn place_order(
        &self,
        customer_id: CustomerId,
        items: Vec<OrderItem>,
    ) -> Result<OrderSaga> {
        if items.is_empty() {
            return Err(SagaError::OrderNotReady("Order has no items".to_string()));
        }
        if let Some(item) = items.iter().find(|item| item.quantity == 0) {
            return Err(SagaError::OrderNotReady(format!(
                "Order line {} has zero quantity",
                item.product_id
            )));
        }
        if let Some(item) = items.iter().find(|item| item.unit_price.is_negative()) {
            return Err(SagaError::OrderNotReady(format!(
                "Order line {} has a negative price",
                item.product_id
            )));
        }
        let total = items.iter().try_fold(Money::zero(), |total, item| {
            item.checked_total_price()
                .and_then(|line| total.checked_add(line))
        });
        if total.is_none() {
            return Err(SagaError::OrderNotReady(
                "Order total is out of range".to_string(),
            ));
        }
        self.get_customer(customer_id).await?;

        let id = OrderId::new(self.last_order_id.fetch_add(1, Ordering::SeqCst) + 1);
        let order = Arc::new(Mutex::new(OrderSaga::new(id, customer_id, items)));
        self.orders.write().await.insert(id, Arc::clone(&order));
        tracing::info!(order_id = %id, "order placed");

        let mut order = order.lock().await;
        self.drive(&mut order, OrderEvent::Placed).await?;
        Ok(order.clone())
    }

    /// Re-enters a waiting order after a supplier delivery.
    ///
    /// Safe to call any number of times: the order is only moved on once all
    /// of its items can be reserved, and arrivals for an order that is no
    /// longer waiting are recorded and otherwise ignored.
    #[tracing::instrument(skip(self, arrival), fields(product_id = %arrival.product_id))]
    pub async fn notify_stock_arrival(
        &self,
        order_id: OrderId,
        arrival: StockArrival,
    ) -> Result<OrderSaga> {
        self.handle(order_id, OrderEvent::StockArrived(arrival))
            .await
    }

    /// Charges the order's payment and ships the order.
    #[tracing::instrument(skip(self))]
    pub async fn pay(&self, order_id: OrderId) -> Result<OrderSaga> {
        self.handle(order_id, OrderEvent::PaymentSubmitted).await
    }

    /// Ships a paid order whose shipment previously failed.
    #[tracing::instrument(skip(self))]
    pub async fn ship(&self, order_id: OrderId) -> Result<OrderSaga> {
        self.handle(order_id, OrderEvent::ShipmentRequested).await
    }

    /// Cancels an order that has not been dispatched yet.
    ///
    /// Withdraws a shipment that was booked but never dispatched, deletes the
    /// payment and releases reserved stock, in that order. Fails
    /// with [`SagaError::TooLateToCancel`] once the order has shipped.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, order_id: OrderId) -> Result<OrderSaga> {
        self.handle(order_id, OrderEvent::CancelRequested).await
    }

    /// Takes back a defective item of a shipped order and settles the return.
    #[tracing::instrument(skip(self))]
    pub async fn process_return(
        &self,
        order_id: OrderId,
        product_id: ProductId,
        resolution: ReturnResolution,
    ) -> Result<OrderSaga> {
        let order = self.order_handle(order_id).await?;
        let mut order = order.lock().await;

        if order.line(&product_id).is_none() {
            return Err(SagaError::ProductNotInOrder {
                order_id,
                product_id,
            });
        }

        self.drive(&mut order, OrderEvent::DefectReported { product_id })
            .await?;
        self.drive(&mut order, OrderEvent::ReturnResolved(resolution))
            .await?;
        Ok(order.clone())
    }

    /// Settles a return whose resolution previously failed.
    #[tracing::instrument(skip(self))]
    pub async fn resolve_return(
        &self,
        order_id: OrderId,
        resolution: ReturnResolution,
    ) -> Result<OrderSaga> {
        self.handle(order_id, OrderEvent::ReturnResolved(resolution))
            .await
    }

    /// Returns a snapshot of an order.
    pub async fn order(&self, order_id: OrderId) -> Result<OrderSaga> {
        let order = self.order_handle(order_id).await?;
        let snapshot = order.lock().await.clone();
        Ok(snapshot)
    }

    /// Returns snapshots of every order, by ID.
    pub async fn orders(&self) -> Vec<OrderSaga> {
        let handles: Vec<_> = self.orders.read().await.values().cloned().collect();

        let mut orders = Vec::with_capacity(handles.len());
        for handle in handles {
            orders.push(handle.lock().await.clone());
        }
        orders.sort_by_key(OrderSaga::id);
        orders
    }

    async fn order_handle(&self, order_id: OrderId) -> Result<Arc<Mutex<OrderSaga>>> {
        self.orders
            .read()
            .await
            .get(&order_id)
            .cloned()
            .ok_or(SagaError::OrderNotFound(order_id))
    }

    async fn handle(&self, order_id: OrderId, event: OrderEvent) -> Result<OrderSaga> {
        let order = self.order_handle(order_id).await?;
        let mut order = order.lock().await;
        self.drive(&mut order, event).await?;
        Ok(order.clone())
    }

    /// Feeds `event` and any follow-up events through the state machine.
    ///
    /// A transition commits only after all of its effects succeeded.
    async fn drive(&self, order: &mut OrderSaga, event: OrderEvent) -> Result<()> {
        let mut pending = VecDeque::from([event]);

        while let Some(event) = pending.pop_front() {
            let from = order.state();
            let (next, effects) = transition(from, &event).inspect_err(|error| {
                tracing::warn!(
                    order_id = %order.id(),
                    event = event.name(),
                    %error,
                    "transition rejected"
                );
            })?;

            for effect in effects {
                if let Some(follow_up) = self.execute(order, effect).await? {
                    pending.push_back(follow_up);
                }
            }

            order.apply(&event, next);
            if from != next {
                tracing::info!(
                    order_id = %order.id(),
                    %from,
                    to = %next,
                    event = event.name(),
                    "order transitioned"
                );
                self.log.log(
                    SUBJECT_TRANSITION,
                    format!("order {}: {from} -> {next}", order.id()),
                );
            }
        }

        Ok(())
    }

    async fn execute(&self, order: &mut OrderSaga, effect: Effect) -> Result<Option<OrderEvent>> {
        tracing::debug!(order_id = %order.id(), %effect, "executing effect");

        match effect {
            Effect::ReserveStock => return self.reserve_stock(order).await,
            Effect::CreatePayment => self.create_payment(order).await?,
            Effect::ChargePayment => {
                self.charge_payment(order).await?;
                return Ok(Some(OrderEvent::ShipmentRequested));
            }
            Effect::CreateShipment => self.create_shipment(order).await?,
            Effect::CancelShipment => self.cancel_shipment(order).await?,
            Effect::VoidPayment => self.void_payment(order).await?,
            Effect::ReleaseStock => self.release_stock(order).await?,
            Effect::ShipReplacement => self.ship_replacement(order).await?,
            Effect::RefundDefect => self.refund_defect(order).await?,
        }
        Ok(None)
    }

    async fn reserve_stock(&self, order: &mut OrderSaga) -> Result<Option<OrderEvent>> {
        if order.reservation_id().is_some() {
            return Ok(Some(OrderEvent::StockReserved));
        }

        let inventory = self
            .connect(STEP_CHECK_AVAILABILITY, self.resolver.inventory())
            .await?;
        let items = order.stock_items();

        let missing = self
            .call(STEP_CHECK_AVAILABILITY, inventory.check_availability(&items))
            .await?;
        if !missing.is_empty() {
            tracing::info!(order_id = %order.id(), ?missing, "awaiting stock");
            order.set_awaiting(missing);
            return Ok(None);
        }

        match self.bounded(inventory.reserve(order.id(), items)).await {
            Ok(reservation) => {
                tracing::info!(
                    order_id = %order.id(),
                    reservation_id = %reservation.reservation_id,
                    "stock reserved"
                );
                order.set_reservation(reservation.reservation_id);
                Ok(Some(OrderEvent::StockReserved))
            }
            Err(StepError::Service(ServiceError::OutOfStock { product_id, .. })) => {
                tracing::info!(
                    order_id = %order.id(),
                    %product_id,
                    "stock taken before reservation"
                );
                order.set_awaiting([product_id]);
                Ok(None)
            }
            Err(source) => Err(self.step_failed(STEP_RESERVE_STOCK, source)),
        }
    }

    async fn create_payment(&self, order: &mut OrderSaga) -> Result<()> {
        if order.payment_id().is_some() {
            return Ok(());
        }

        let payments = self
            .connect(STEP_CREATE_PAYMENT, self.resolver.payment())
            .await?;
        let payment = self
            .call(
                STEP_CREATE_PAYMENT,
                payments.create(order.id(), order.total()),
            )
            .await?;

        tracing::info!(
            order_id = %order.id(),
            payment_id = %payment.id,
            value = %payment.value,
            "payment created"
        );
        order.set_payment(payment.id);
        Ok(())
    }

    async fn charge_payment(&self, order: &mut OrderSaga) -> Result<()> {
        if order.is_payment_charged() {
            return Ok(());
        }
        self.create_payment(order).await?;
        let payment_id = self.require_payment(order)?;

        let payments = self
            .connect(STEP_CHARGE_PAYMENT, self.resolver.payment())
            .await?;
        self.call(STEP_CHARGE_PAYMENT, payments.pay(payment_id, order.total()))
            .await?;

        tracing::info!(order_id = %order.id(), %payment_id, "payment charged");
        order.mark_charged();
        Ok(())
    }

    async fn create_shipment(&self, order: &mut OrderSaga) -> Result<()> {
        let shipping = self
            .connect(STEP_CREATE_SHIPMENT, self.resolver.shipping())
            .await?;

        let tracking_number = match order.tracking_number().map(str::to_owned) {
            Some(tracking_number) => tracking_number,
            None => {
                let shipment = self
                    .call(
                        STEP_CREATE_SHIPMENT,
                        shipping.create_shipment(order.id(), order.stock_items()),
                    )
                    .await?;
                order.set_tracking_number(shipment.tracking_number.clone());
                shipment.tracking_number
            }
        };

        self.call(
            STEP_CONFIRM_DISPATCH,
            shipping.confirm_dispatch(&tracking_number),
        )
        .await?;
        tracing::info!(order_id = %order.id(), %tracking_number, "order dispatched");
        Ok(())
    }

    async fn cancel_shipment(&self, order: &mut OrderSaga) -> Result<()> {
        let Some(tracking_number) = order.tracking_number().map(str::to_owned) else {
            return Ok(());
        };

        let shipping = self
            .connect(STEP_CANCEL_SHIPMENT, self.resolver.shipping())
            .await?;
        self.call(
            STEP_CANCEL_SHIPMENT,
            shipping.cancel_shipment(&tracking_number),
        )
        .await?;

        tracing::info!(order_id = %order.id(), %tracking_number, "shipment cancelled");
        order.cancel_shipment();
        Ok(())
    }

    async fn void_payment(&self, order: &mut OrderSaga) -> Result<()> {
        let Some(payment_id) = order.payment_id() else {
            return Ok(());
        };

        let payments = self
            .connect(STEP_DELETE_PAYMENT, self.resolver.payment())
            .await?;
        let payment = self
            .call(STEP_DELETE_PAYMENT, payments.delete(payment_id))
            .await?;

        tracing::info!(
            order_id = %order.id(),
            %payment_id,
            value = %payment.value,
            "payment voided"
        );
        order.void_payment();
        Ok(())
    }

    async fn release_stock(&self, order: &mut OrderSaga) -> Result<()> {
        let Some(reservation_id) = order.reservation_id().map(str::to_owned) else {
            return Ok(());
        };

        let inventory = self
            .connect(STEP_RELEASE_STOCK, self.resolver.inventory())
            .await?;
        self.call(STEP_RELEASE_STOCK, inventory.release(&reservation_id))
            .await?;

        tracing::info!(order_id = %order.id(), %reservation_id, "stock released");
        order.clear_reservation();
        Ok(())
    }

    async fn ship_replacement(&self, order: &mut OrderSaga) -> Result<()> {
        let line = self.defective_line(order)?;
        let shipping = self
            .connect(STEP_CREATE_SHIPMENT, self.resolver.shipping())
            .await?;

        let tracking_number = match order.replacement_tracking_number().map(str::to_owned) {
            Some(tracking_number) => tracking_number,
            None => {
                let shipment = self
                    .call(
                        STEP_CREATE_SHIPMENT,
                        shipping.create_shipment(order.id(), vec![StockItem::from(&line)]),
                    )
                    .await?;
                order.set_replacement_tracking_number(shipment.tracking_number.clone());
                shipment.tracking_number
            }
        };

        self.call(
            STEP_CONFIRM_DISPATCH,
            shipping.confirm_dispatch(&tracking_number),
        )
        .await?;
        tracing::info!(
            order_id = %order.id(),
            product_id = %line.product_id,
            %tracking_number,
            "replacement dispatched"
        );
        Ok(())
    }

    async fn refund_defect(&self, order: &mut OrderSaga) -> Result<()> {
        if order.refunded().is_some() {
            return Ok(());
        }
        let line = self.defective_line(order)?;
        let payment_id = self.require_payment(order)?;

        let payments = self
            .connect(STEP_GET_PAYMENT, self.resolver.payment())
            .await?;
        let payment = self
            .call(STEP_GET_PAYMENT, payments.get(payment_id))
            .await?;

        let amount = payment
            .value
            .proportion(line.total_price(), order.total())
            .ok_or_else(|| {
                SagaError::OrderNotReady(format!("Order {} has a zero total", order.id()))
            })?;

        let refunded = self
            .call(STEP_REFUND_PAYMENT, payments.refund(payment_id, amount))
            .await?;

        tracing::info!(
            order_id = %order.id(),
            %payment_id,
            %amount,
            remaining = %refunded.value,
            "defective item refunded"
        );
        order.set_refunded(amount);
        Ok(())
    }

    fn defective_line(&self, order: &OrderSaga) -> Result<OrderItem> {
        order
            .defective()
            .and_then(|product_id| order.line(product_id))
            .cloned()
            .ok_or_else(|| {
                SagaError::OrderNotReady(format!("Order {} has no defective item", order.id()))
            })
    }

    fn require_payment(&self, order: &OrderSaga) -> Result<PaymentId> {
        order.payment_id().ok_or_else(|| {
            SagaError::OrderNotReady(format!("Order {} has no payment", order.id()))
        })
    }

    /// Runs a service call under the call timeout.
    pub(crate) async fn bounded<T>(
        &self,
        call: impl Future<Output = services::Result<T>>,
    ) -> std::result::Result<T, StepError> {
        match tokio::time::timeout(self.config.call_timeout, call).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(StepError::Timeout(self.config.call_timeout)),
        }
    }

    /// Runs a service call under the call timeout, reporting failure as `step`.
    pub(crate) async fn call<T>(
        &self,
        step: &'static str,
        call: impl Future<Output = services::Result<T>>,
    ) -> Result<T> {
        self.bounded(call)
            .await
            .map_err(|source| self.step_failed(step, source))
    }

    /// Resolves a service for `step`.
    pub(crate) async fn connect<S>(
        &self,
        step: &'static str,
        resolve: impl Future<Output = std::result::Result<S, StepError>>,
    ) -> Result<S> {
        resolve
            .await
            .map_err(|source| self.step_failed(step, source))
    }

    pub(crate) fn step_failed(&self, step: &'static str, source: StepError) -> SagaError {
        metrics::counter!("saga_step_failures_total", "step" => step).increment(1);
        tracing::error!(step, error = %source, "saga step failed");
        self.log.log(step, format!("step failed: {source}"));
        SagaError::StepFailed { step, source }
    }
}
