//! Saga orchestration for order fulfillment.
//!
//! An order moves through an explicit state machine:
//!
//! ```text
//! Created → AwaitingStock → PaymentPending → Paid → Shipped → ReturnReceived → ReplacementShipped | PartiallyRefunded
//! ```
//!
//! with `Cancelled` reachable from every state before `Shipped`. The
//! [`transition`] function decides, without side effects, which state an
//! event leads to and which remote calls must succeed first; the
//! [`Orchestrator`] performs those calls against services it resolves through
//! the registry for every step, and commits the new state once they succeed.
//!
//! There is no implicit rollback. A failing step stops the operation and
//! leaves the order in the last state it fully reached; compensation runs
//! only when an order is cancelled or a defective item is returned.

pub mod error;
pub mod events;
pub mod order;
pub mod order_fulfillment;
pub mod orchestrator;
pub mod resolver;
pub mod scenarios;
pub mod state;
pub mod transition;

pub use error::{Result, SagaError, StepError};
pub use events::{Effect, OrderEvent, ReturnResolution, StockArrival};
pub use order::OrderSaga;
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use resolver::{RegistryResolver, ServiceResolver};
pub use scenarios::{Scenario, ScenarioOutcome, seed_inventory};
pub use state::OrderState;
pub use transition::transition;
