//! Shared value types for the order fulfillment services.
//!
//! Identifiers are service-assigned unsigned integers; monetary amounts are
//! fixed-point cents so that payment arithmetic never rounds.

mod money;
mod types;

pub use money::Money;
pub use types::{CustomerId, OrderId, OrderItem, PaymentId, ProductId, StockItem};
