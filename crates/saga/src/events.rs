//! Inputs that drive an order through its lifecycle, and the side effects
//! they ask for.

use common::ProductId;
use serde::{Deserialize, Serialize};

/// How a returned defective item is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnResolution {
    /// Ship a new unit at no charge.
    Replacement,
    /// Refund the item's share of the payment.
    Refund,
}

/// A supplier delivery reported back to a waiting order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockArrival {
    pub product_id: ProductId,
    pub supplier: String,
}

impl StockArrival {
    pub fn new(product_id: impl Into<ProductId>, supplier: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            supplier: supplier.into(),
        }
    }
}

/// Something that happened to an order, or was asked of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// The order was placed and stock should be requested.
    Placed,

    /// A missing product was delivered by a supplier.
    StockArrived(StockArrival),

    /// Every item is reserved.
    StockReserved,

    /// The customer asked to pay.
    PaymentSubmitted,

    /// The paid order should leave the warehouse.
    ShipmentRequested,

    /// The customer asked to cancel.
    CancelRequested,

    /// A shipped item came back defective.
    DefectReported { product_id: ProductId },

    /// The return was settled.
    ReturnResolved(ReturnResolution),
}

impl OrderEvent {
    /// Returns the event name.
    pub fn name(&self) -> &'static str {
        match self {
            OrderEvent::Placed => "Placed",
            OrderEvent::StockArrived(_) => "StockArrived",
            OrderEvent::StockReserved => "StockReserved",
            OrderEvent::PaymentSubmitted => "PaymentSubmitted",
            OrderEvent::ShipmentRequested => "ShipmentRequested",
            OrderEvent::CancelRequested => "CancelRequested",
            OrderEvent::DefectReported { .. } => "DefectReported",
            OrderEvent::ReturnResolved(_) => "ReturnResolved",
        }
    }
}

/// A remote call the orchestrator must make before a transition commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effect {
    /// Reserve every item, or record what is still missing.
    ReserveStock,
    /// Create the payment for the order total.
    CreatePayment,
    /// Charge the payment.
    ChargePayment,
    /// Book and dispatch a shipment of the whole order.
    CreateShipment,
    /// Withdraw a booked shipment that never left.
    CancelShipment,
    /// Delete the payment.
    VoidPayment,
    /// Return reserved stock.
    ReleaseStock,
    /// Book and dispatch a shipment of the defective item only.
    ShipReplacement,
    /// Refund the defective item's share of the payment.
    RefundDefect,
}

impl Effect {
    /// Returns the effect name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Effect::ReserveStock => "ReserveStock",
            Effect::CreatePayment => "CreatePayment",
            Effect::ChargePayment => "ChargePayment",
            Effect::CreateShipment => "CreateShipment",
            Effect::CancelShipment => "CancelShipment",
            Effect::VoidPayment => "VoidPayment",
            Effect::ReleaseStock => "ReleaseStock",
            Effect::ShipReplacement => "ShipReplacement",
            Effect::RefundDefect => "RefundDefect",
        }
    }
}

impl std::fmt::Display for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
