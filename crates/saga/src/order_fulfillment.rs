//! Step names of the order fulfillment saga.
//!
//! Every remote call the orchestrator makes is tagged with one of these, in
//! logs, in log-bus events and in [`SagaError::StepFailed`](crate::SagaError).

pub const STEP_CREATE_CUSTOMER: &str = "customer.create";
pub const STEP_GET_CUSTOMER: &str = "customer.get";

pub const STEP_CHECK_AVAILABILITY: &str = "inventory.check_availability";
pub const STEP_RESERVE_STOCK: &str = "inventory.reserve";
pub const STEP_RELEASE_STOCK: &str = "inventory.release";
pub const STEP_RECEIVE_DELIVERY: &str = "inventory.receive_delivery";

pub const STEP_CREATE_PAYMENT: &str = "payment.create";
pub const STEP_GET_PAYMENT: &str = "payment.get";
pub const STEP_CHARGE_PAYMENT: &str = "payment.pay";
pub const STEP_DELETE_PAYMENT: &str = "payment.delete";
pub const STEP_REFUND_PAYMENT: &str = "payment.refund";

pub const STEP_CREATE_SHIPMENT: &str = "shipping.create_shipment";
pub const STEP_CONFIRM_DISPATCH: &str = "shipping.confirm_dispatch";
pub const STEP_CANCEL_SHIPMENT: &str = "shipping.cancel_shipment";

/// Log-bus subject for scenario entry and failure.
pub const SUBJECT_RUN_SCENARIO: &str = "Orchestrator.run_scenario";

/// Log-bus subject for order state changes.
pub const SUBJECT_TRANSITION: &str = "Orchestrator.transition";
