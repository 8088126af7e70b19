//! Domain service error types.

use common::{Money, PaymentId, ProductId};
use thiserror::Error;

use crate::payment::PaymentState;

/// Errors returned by domain services and the transport in front of them.
///
/// Services never retry; every error is surfaced to the caller.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The requested record does not exist (or was deleted).
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The payment has already been paid.
    #[error("Payment {id} is already paid")]
    AlreadyPaid { id: PaymentId },

    /// The paid amount differs from the recorded amount.
    #[error("Payment {id} amount mismatch: expected {expected}, got {actual}")]
    AmountMismatch {
        id: PaymentId,
        expected: Money,
        actual: Money,
    },

    /// A monetary amount was negative.
    #[error("Invalid value: {value} (must not be negative)")]
    InvalidValue { value: Money },

    /// A refund would drive the payment value below zero.
    #[error("Refund of {refund} exceeds payment {id} value {value}")]
    RefundExceedsValue {
        id: PaymentId,
        value: Money,
        refund: Money,
    },

    /// Only paid payments can be refunded.
    #[error("Payment {id} is {state}, only paid payments can be refunded")]
    NotPaid { id: PaymentId, state: PaymentState },

    /// Not enough stock to reserve the requested quantity.
    #[error("Out of stock: {product_id} (requested {requested}, available {available})")]
    OutOfStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// Adding the quantity would exceed the largest representable stock level.
    #[error("Stock overflow: {product_id} at {level}, cannot add {quantity}")]
    StockOverflow {
        product_id: ProductId,
        level: u32,
        quantity: u32,
    },

    /// The shipment has already been handed to the carrier.
    #[error("Shipment {tracking_number} is already dispatched")]
    AlreadyDispatched { tracking_number: String },

    /// Nothing is listening at the dialed address.
    #[error("Connection refused: {address}")]
    ConnectionRefused { address: String },

    /// The dialed address hosts a different service.
    #[error("Address {address} serves {actual}, expected {expected}")]
    WrongService {
        address: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// The service is up but refusing work.
    #[error("{service} service unavailable: {reason}")]
    Unavailable {
        service: &'static str,
        reason: String,
    },
}

impl ServiceError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        ServiceError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Convenience type alias for service results.
pub type Result<T> = std::result::Result<T, ServiceError>;
