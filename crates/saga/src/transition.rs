//! The order state machine as a pure function.

use crate::error::{Result, SagaError};
use crate::events::{Effect, OrderEvent, ReturnResolution};
use crate::state::OrderState;

/// Computes the state an event leads to and the effects that must succeed
/// before that state is committed.
///
/// Compensations are listed in reverse order of the forward steps they undo.
/// A supplier delivery outside `AwaitingStock` is accepted and ignored.
pub fn transition(state: OrderState, event: &OrderEvent) -> Result<(OrderState, Vec<Effect>)> {
    use OrderState::*;

    let outcome = match (state, event) {
        (Created, OrderEvent::Placed) => (AwaitingStock, vec![Effect::ReserveStock]),

        (AwaitingStock, OrderEvent::StockArrived(_)) => (AwaitingStock, vec![Effect::ReserveStock]),
        (_, OrderEvent::StockArrived(_)) => (state, Vec::new()),

        (AwaitingStock, OrderEvent::StockReserved) => {
            (PaymentPending, vec![Effect::CreatePayment])
        }
        (PaymentPending, OrderEvent::PaymentSubmitted) => (Paid, vec![Effect::ChargePayment]),
        (Paid, OrderEvent::ShipmentRequested) => (Shipped, vec![Effect::CreateShipment]),

        (Created, OrderEvent::CancelRequested) => (Cancelled, Vec::new()),
        (AwaitingStock, OrderEvent::CancelRequested) => (Cancelled, vec![Effect::ReleaseStock]),
        (PaymentPending, OrderEvent::CancelRequested) => {
            (Cancelled, vec![Effect::VoidPayment, Effect::ReleaseStock])
        }
        (Paid, OrderEvent::CancelRequested) => (
            Cancelled,
            vec![
                Effect::CancelShipment,
                Effect::VoidPayment,
                Effect::ReleaseStock,
            ],
        ),
        (s, OrderEvent::CancelRequested) if s.is_dispatched() => {
            return Err(SagaError::TooLateToCancel { state });
        }

        (Shipped, OrderEvent::DefectReported { .. }) => (ReturnReceived, Vec::new()),
        (ReturnReceived, OrderEvent::ReturnResolved(ReturnResolution::Replacement)) => {
            (ReplacementShipped, vec![Effect::ShipReplacement])
        }
        (ReturnReceived, OrderEvent::ReturnResolved(ReturnResolution::Refund)) => {
            (PartiallyRefunded, vec![Effect::RefundDefect])
        }

        _ => {
            return Err(SagaError::InvalidTransition {
                state,
                event: event.name(),
            });
        }
    };

    Ok(outcome)
}
