//! Order state machine.

use serde::{Deserialize, Serialize};

/// The state of an order in its lifecycle.
///
/// State transitions:
/// ```text
/// Created ──► AwaitingStock ──► PaymentPending ──► Paid ──► Shipped ──► ReturnReceived ──┬──► ReplacementShipped
///    │              │                 │              │                                  └──► PartiallyRefunded
///    └──────────────┴─────────────────┴──────────────┴──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderState {
    /// Order recorded, stock not yet requested.
    #[default]
    Created,

    /// Waiting until every item can be reserved.
    AwaitingStock,

    /// All stock reserved, payment created but not charged.
    PaymentPending,

    /// Payment charged, shipment not yet dispatched.
    Paid,

    /// Dispatched to the customer.
    Shipped,

    /// A defective item came back.
    ReturnReceived,

    /// The defective item was replaced free of charge (terminal state).
    ReplacementShipped,

    /// The defective item's share was refunded (terminal state).
    PartiallyRefunded,

    /// Cancelled before dispatch (terminal state).
    Cancelled,
}

impl OrderState {
    /// Returns true if the order can still be cancelled.
    pub fn can_cancel(&self) -> bool {
        matches!(
            self,
            OrderState::Created
                | OrderState::AwaitingStock
                | OrderState::PaymentPending
                | OrderState::Paid
        )
    }

    /// Returns true once the order has left the warehouse.
    pub fn is_dispatched(&self) -> bool {
        matches!(
            self,
            OrderState::Shipped
                | OrderState::ReturnReceived
                | OrderState::ReplacementShipped
                | OrderState::PartiallyRefunded
        )
    }

    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderState::ReplacementShipped | OrderState::PartiallyRefunded | OrderState::Cancelled
        )
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderState::Created => "Created",
            OrderState::AwaitingStock => "AwaitingStock",
            OrderState::PaymentPending => "PaymentPending",
            OrderState::Paid => "Paid",
            OrderState::Shipped => "Shipped",
            OrderState::ReturnReceived => "ReturnReceived",
            OrderState::ReplacementShipped => "ReplacementShipped",
            OrderState::PartiallyRefunded => "PartiallyRefunded",
            OrderState::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
