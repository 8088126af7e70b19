//! Saga error types.

use std::time::Duration;

use common::{OrderId, ProductId};
use registry::RegistryError;
use services::ServiceError;
use thiserror::Error;

use crate::state::OrderState;

/// Why a single saga step could not complete.
#[derive(Debug, Error)]
pub enum StepError {
    /// The service could not be located.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The service rejected the call, or could not be reached.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// The service did not answer in time.
    #[error("call timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors that can occur during saga operations.
#[derive(Debug, Error)]
pub enum SagaError {
    /// No scenario is registered under this name.
    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),

    /// The order has already left the warehouse.
    #[error("Too late to cancel: order is {state}")]
    TooLateToCancel { state: OrderState },

    /// The event is not legal in the order's current state.
    #[error("Invalid transition: cannot apply {event} in {state} state")]
    InvalidTransition {
        state: OrderState,
        event: &'static str,
    },

    /// Order not found.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// Order is not in the expected shape for the operation.
    #[error("Order not ready: {0}")]
    OrderNotReady(String),

    /// A return named a product the order does not contain.
    #[error("Product {product_id} is not part of order {order_id}")]
    ProductNotInOrder {
        order_id: OrderId,
        product_id: ProductId,
    },

    /// A saga step failed.
    #[error("Saga step '{step}' failed: {source}")]
    StepFailed {
        step: &'static str,
        #[source]
        source: StepError,
    },

    /// A scenario finished but its final check did not hold.
    #[error("Scenario check failed: {0}")]
    ScenarioCheck(String),
}

impl SagaError {
    /// The service error behind a failed step, if any.
    pub fn service_error(&self) -> Option<&ServiceError> {
        match self {
            SagaError::StepFailed {
                source: StepError::Service(error),
                ..
            } => Some(error),
            _ => None,
        }
    }

    /// Returns true if a step failed because its service could not be found.
    pub fn is_service_unavailable(&self) -> bool {
        matches!(
            self,
            SagaError::StepFailed {
                source: StepError::Registry(RegistryError::ServiceUnavailable { .. }),
                ..
            }
        )
    }

    /// Returns true if a step failed because a call or lookup timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            SagaError::StepFailed {
                source: StepError::Timeout(_) | StepError::Registry(RegistryError::Timeout { .. }),
                ..
            }
        )
    }

    /// The step that failed, if this is a step failure.
    pub fn step(&self) -> Option<&'static str> {
        match self {
            SagaError::StepFailed { step, .. } => Some(step),
            _ => None,
        }
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
