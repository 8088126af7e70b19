//! Saga record of one order.

use std::collections::BTreeSet;

use common::{CustomerId, Money, OrderId, OrderItem, PaymentId, ProductId, StockItem};
use serde::{Deserialize, Serialize};

use crate::events::{OrderEvent, StockArrival};
use crate::state::OrderState;

/// An order together with everything the saga has learned about it.
///
/// State only changes through [`OrderSaga::apply`], after the effects of a
/// transition have succeeded. The bookkeeping setters are called by effects
/// as each remote call completes, so a failed step leaves a record that says
/// exactly what was done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSaga {
    id: OrderId,
    customer_id: CustomerId,
    items: Vec<OrderItem>,
    state: OrderState,
    /// Products that could not be reserved at the last attempt.
    awaiting: BTreeSet<ProductId>,
    /// Supplier deliveries reported for this order, in arrival order.
    arrivals: Vec<StockArrival>,
    reservation_id: Option<String>,
    payment_id: Option<PaymentId>,
    payment_charged: bool,
    voided_payment_id: Option<PaymentId>,
    tracking_number: Option<String>,
    cancelled_tracking_number: Option<String>,
    defective: Option<ProductId>,
    replacement_tracking_number: Option<String>,
    refunded: Option<Money>,
}

impl OrderSaga {
    /// Creates a new order in the `Created` state.
    pub fn new(id: OrderId, customer_id: CustomerId, items: Vec<OrderItem>) -> Self {
        Self {
            id,
            customer_id,
            items,
            state: OrderState::Created,
            awaiting: BTreeSet::new(),
            arrivals: Vec::new(),
            reservation_id: None,
            payment_id: None,
            payment_charged: false,
            voided_payment_id: None,
            tracking_number: None,
            cancelled_tracking_number: None,
            defective: None,
            replacement_tracking_number: None,
            refunded: None,
        }
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn state(&self) -> OrderState {
        self.state
    }

    /// Sum of all line totals.
    pub fn total(&self) -> Money {
        self.items.iter().map(OrderItem::total_price).sum()
    }

    /// The items as the inventory and shipping services see them.
    pub fn stock_items(&self) -> Vec<StockItem> {
        self.items.iter().map(StockItem::from).collect()
    }

    /// The order line for `product_id`, if the order contains it.
    pub fn line(&self, product_id: &ProductId) -> Option<&OrderItem> {
        self.items.iter().find(|item| &item.product_id == product_id)
    }

    pub fn awaiting(&self) -> impl Iterator<Item = &ProductId> {
        self.awaiting.iter()
    }

    pub fn is_awaiting_stock(&self) -> bool {
        !self.awaiting.is_empty()
    }

    pub fn arrivals(&self) -> &[StockArrival] {
        &self.arrivals
    }

    pub fn reservation_id(&self) -> Option<&str> {
        self.reservation_id.as_deref()
    }

    pub fn payment_id(&self) -> Option<PaymentId> {
        self.payment_id
    }

    pub fn is_payment_charged(&self) -> bool {
        self.payment_charged
    }

    pub fn voided_payment_id(&self) -> Option<PaymentId> {
        self.voided_payment_id
    }

    pub fn tracking_number(&self) -> Option<&str> {
        self.tracking_number.as_deref()
    }

    /// A shipment that was booked but withdrawn when the order was cancelled.
    pub fn cancelled_tracking_number(&self) -> Option<&str> {
        self.cancelled_tracking_number.as_deref()
    }

    pub fn defective(&self) -> Option<&ProductId> {
        self.defective.as_ref()
    }

    pub fn replacement_tracking_number(&self) -> Option<&str> {
        self.replacement_tracking_number.as_deref()
    }

    pub fn refunded(&self) -> Option<Money> {
        self.refunded
    }

    /// Commits `next` as the order's state and records the event's data.
    pub fn apply(&mut self, event: &OrderEvent, next: OrderState) {
        match event {
            OrderEvent::StockArrived(arrival) => self.arrivals.push(arrival.clone()),
            OrderEvent::DefectReported { product_id } => self.defective = Some(product_id.clone()),
            _ => {}
        }
        self.state = next;
    }

    pub(crate) fn set_awaiting(&mut self, missing: impl IntoIterator<Item = ProductId>) {
        self.awaiting = missing.into_iter().collect();
    }

    pub(crate) fn set_reservation(&mut self, reservation_id: String) {
        self.awaiting.clear();
        self.reservation_id = Some(reservation_id);
    }

    pub(crate) fn clear_reservation(&mut self) {
        self.reservation_id = None;
    }

    pub(crate) fn set_payment(&mut self, payment_id: PaymentId) {
        self.payment_id = Some(payment_id);
    }

    pub(crate) fn mark_charged(&mut self) {
        self.payment_charged = true;
    }

    pub(crate) fn void_payment(&mut self) {
        self.voided_payment_id = self.payment_id.take();
        self.payment_charged = false;
    }

    pub(crate) fn set_tracking_number(&mut self, tracking_number: String) {
        self.tracking_number = Some(tracking_number);
    }

    pub(crate) fn cancel_shipment(&mut self) {
        self.cancelled_tracking_number = self.tracking_number.take();
    }

    pub(crate) fn set_replacement_tracking_number(&mut self, tracking_number: String) {
        self.replacement_tracking_number = Some(tracking_number);
    }

    pub(crate) fn set_refunded(&mut self, amount: Money) {
        self.refunded = Some(amount);
    }
}
