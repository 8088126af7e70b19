//! Named end-to-end runs of the fulfillment saga.

use std::str::FromStr;
use std::time::{Duration, Instant};

use common::{Money, OrderId, OrderItem, ProductId};
use serde::Serialize;
use services::{Customer, InMemoryInventoryService, Payment, ServiceError, SupplierDelivery};
use tokio::task::JoinHandle;

use crate::error::{Result, SagaError, StepError};
use crate::events::{ReturnResolution, StockArrival};
use crate::order::OrderSaga;
use crate::order_fulfillment::*;
use crate::orchestrator::Orchestrator;
use crate::state::OrderState;

/// A product the demo shop sells.
#[derive(Debug, Clone, Copy)]
pub struct Product {
    pub id: &'static str,
    pub unit_price: Money,
    pub initial_stock: u32,
}

pub const KEYBOARD: &str = "SKU-KEYBOARD";
pub const HEADSET: &str = "SKU-HEADSET";
pub const MOUSE: &str = "SKU-MOUSE";
pub const MONITOR: &str = "SKU-MONITOR";
pub const DOCK: &str = "SKU-DOCK";
pub const WEBCAM: &str = "SKU-WEBCAM";

/// Everything the scenarios order. `DOCK` and `WEBCAM` start out of stock.
pub const CATALOGUE: [Product; 6] = [
    Product {
        id: KEYBOARD,
        unit_price: Money::from_cents(5000),
        initial_stock: 1000,
    },
    Product {
        id: HEADSET,
        unit_price: Money::from_cents(5000),
        initial_stock: 1000,
    },
    Product {
        id: MOUSE,
        unit_price: Money::from_cents(1999),
        initial_stock: 1000,
    },
    Product {
        id: MONITOR,
        unit_price: Money::from_cents(19900),
        initial_stock: 1000,
    },
    Product {
        id: DOCK,
        unit_price: Money::from_cents(8990),
        initial_stock: 0,
    },
    Product {
        id: WEBCAM,
        unit_price: Money::from_cents(3450),
        initial_stock: 0,
    },
];

/// Stocks an inventory with the catalogue.
pub async fn seed_inventory(inventory: &InMemoryInventoryService) {
    for product in CATALOGUE {
        inventory.set_stock(product.id, product.initial_stock).await;
    }
}

fn line(product_id: &'static str, quantity: u32) -> OrderItem {
    let unit_price = CATALOGUE
        .iter()
        .find(|product| product.id == product_id)
        .map(|product| product.unit_price)
        .unwrap_or_default();
    OrderItem::new(product_id, quantity, unit_price)
}

/// The scenarios `run_scenario` accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scenario {
    /// Customer and payment calls exercised one by one.
    Direct,
    /// Everything in stock: order, pay, ship.
    InStock,
    /// Two of three items arrive later from two suppliers.
    PartialStock,
    /// Cancel before dispatch, then try again after dispatch.
    Cancel,
    /// A defective item is replaced.
    ReturnReplacement,
    /// A defective item is refunded.
    ReturnRefund,
}

impl Scenario {
    pub const ALL: [Scenario; 6] = [
        Scenario::Direct,
        Scenario::InStock,
        Scenario::PartialStock,
        Scenario::Cancel,
        Scenario::ReturnReplacement,
        Scenario::ReturnRefund,
    ];

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            Scenario::Direct => "direct",
            Scenario::InStock => "in-stock",
            Scenario::PartialStock => "partial-stock",
            Scenario::Cancel => "cancel",
            Scenario::ReturnReplacement => "return-replacement",
            Scenario::ReturnRefund => "return-refund",
        }
    }
}

impl FromStr for Scenario {
    type Err = SagaError;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "direct" => Ok(Scenario::Direct),
            "in-stock" | "s1" => Ok(Scenario::InStock),
            "partial-stock" | "s2" => Ok(Scenario::PartialStock),
            "cancel" | "s3" => Ok(Scenario::Cancel),
            "return-replacement" | "s4" => Ok(Scenario::ReturnReplacement),
            "return-refund" | "s5" => Ok(Scenario::ReturnRefund),
            other => Err(SagaError::UnknownScenario(other.to_string())),
        }
    }
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// What a scenario run left behind.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScenarioOutcome {
    pub scenario: &'static str,
    pub customers: Vec<Customer>,
    pub orders: Vec<OrderSaga>,
    pub payments: Vec<Payment>,
}

impl ScenarioOutcome {
    fn new(scenario: Scenario) -> Self {
        Self {
            scenario: scenario.name(),
            ..Self::default()
        }
    }

    /// The final state of the order with `order_id`.
    pub fn order_state(&self, order_id: OrderId) -> Option<OrderState> {
        self.orders
            .iter()
            .find(|order| order.id() == order_id)
            .map(OrderSaga::state)
    }
}

fn expect_state(order: &OrderSaga, expected: OrderState) -> Result<()> {
    if order.state() == expected {
        return Ok(());
    }
    Err(SagaError::ScenarioCheck(format!(
        "order {} is {}, expected {expected}",
        order.id(),
        order.state()
    )))
}

impl Orchestrator {
    /// Runs the scenario registered under `name`.
    ///
    /// Accepts the scenario names and the aliases `s1` to `s5`. Entry and
    /// failure are both reported on the log bus.
    #[tracing::instrument(skip(self))]
    pub async fn run_scenario(&self, name: &str) -> Result<ScenarioOutcome> {
        self.log()
            .log(SUBJECT_RUN_SCENARIO, format!("run scenario: {name}"));
        metrics::counter!("scenario_runs_total").increment(1);
        let started = Instant::now();

        let result = match name.parse::<Scenario>() {
            Ok(scenario) => self.run(scenario).await,
            Err(error) => Err(error),
        };

        metrics::histogram!("scenario_duration_seconds").record(started.elapsed().as_secs_f64());
        match &result {
            Ok(outcome) => {
                tracing::info!(scenario = outcome.scenario, "scenario completed");
            }
            Err(error) => {
                metrics::counter!("scenario_failures_total").increment(1);
                tracing::error!(scenario = name, %error, "scenario failed");
                self.log()
                    .log(SUBJECT_RUN_SCENARIO, format!("scenario {name} failed: {error}"));
            }
        }
        result
    }

    async fn run(&self, scenario: Scenario) -> Result<ScenarioOutcome> {
        let mut outcome = ScenarioOutcome::new(scenario);
        match scenario {
            Scenario::Direct => self.run_direct(&mut outcome).await?,
            Scenario::InStock => self.run_in_stock(&mut outcome).await?,
            Scenario::PartialStock => self.run_partial_stock(&mut outcome).await?,
            Scenario::Cancel => self.run_cancel(&mut outcome).await?,
            Scenario::ReturnReplacement => {
                self.run_return(&mut outcome, ReturnResolution::Replacement)
                    .await?
            }
            Scenario::ReturnRefund => {
                self.run_return(&mut outcome, ReturnResolution::Refund)
                    .await?
            }
        }
        self.collect_payments(&mut outcome).await?;
        Ok(outcome)
    }

    async fn run_direct(&self, outcome: &mut ScenarioOutcome) -> Result<()> {
        let simon = self.create_customer("Simon", "Munich").await?;
        let max = self.create_customer("Max", "Berlin").await?;
        let max = self.get_customer(max.id).await?;
        outcome.customers = vec![simon, max];

        let value = Money::from_cents(3398);
        let payments = self
            .connect(STEP_CREATE_PAYMENT, self.resolver().payment())
            .await?;
        let created = self
            .call(STEP_CREATE_PAYMENT, payments.create(OrderId::new(1), value))
            .await?;
        let fetched = self.get_payment(created.id).await?;
        if fetched != created {
            return Err(SagaError::ScenarioCheck(format!(
                "payment {} read back differently",
                created.id
            )));
        }

        let payments = self
            .connect(STEP_CHARGE_PAYMENT, self.resolver().payment())
            .await?;
        self.call(STEP_CHARGE_PAYMENT, payments.pay(created.id, value))
            .await?;

        let payments = self
            .connect(STEP_DELETE_PAYMENT, self.resolver().payment())
            .await?;
        let deleted = self
            .call(STEP_DELETE_PAYMENT, payments.delete(created.id))
            .await?;

        let payments = self
            .connect(STEP_GET_PAYMENT, self.resolver().payment())
            .await?;
        match self.bounded(payments.get(created.id)).await {
            Err(StepError::Service(ServiceError::NotFound { .. })) => {}
            Ok(_) => {
                return Err(SagaError::ScenarioCheck(format!(
                    "payment {} still visible after delete",
                    created.id
                )));
            }
            Err(source) => return Err(self.step_failed(STEP_GET_PAYMENT, source)),
        }

        outcome.payments.push(deleted);
        Ok(())
    }

    async fn run_in_stock(&self, outcome: &mut ScenarioOutcome) -> Result<()> {
        let customer = self.create_customer("Ada", "London").await?;
        let order = self
            .place_order(customer.id, vec![line(KEYBOARD, 1), line(MOUSE, 2)])
            .await?;
        expect_state(&order, OrderState::PaymentPending)?;

        let order = self.pay(order.id()).await?;
        expect_state(&order, OrderState::Shipped)?;

        outcome.customers.push(customer);
        outcome.orders.push(order);
        Ok(())
    }

    async fn run_partial_stock(&self, outcome: &mut ScenarioOutcome) -> Result<()> {
        let customer = self.create_customer("Grace", "Arlington").await?;
        let order = self
            .place_order(
                customer.id,
                vec![line(MOUSE, 1), line(DOCK, 1), line(WEBCAM, 1)],
            )
            .await?;
        expect_state(&order, OrderState::AwaitingStock)?;

        let [first, second] = self.config().supplier_delays;
        let suppliers = [
            self.spawn_supplier(order.id(), SupplierDelivery::new(DOCK, 1, "Supplier A"), first),
            self.spawn_supplier(
                order.id(),
                SupplierDelivery::new(WEBCAM, 1, "Supplier B"),
                second,
            ),
        ];
        for supplier in suppliers {
            supplier.await.map_err(|error| {
                SagaError::ScenarioCheck(format!("supplier task failed: {error}"))
            })??;
        }

        let order = self.order(order.id()).await?;
        expect_state(&order, OrderState::PaymentPending)?;

        let order = self.pay(order.id()).await?;
        expect_state(&order, OrderState::Shipped)?;

        outcome.customers.push(customer);
        outcome.orders.push(order);
        Ok(())
    }

    async fn run_cancel(&self, outcome: &mut ScenarioOutcome) -> Result<()> {
        let customer = self.create_customer("Linus", "Helsinki").await?;

        let pending = self
            .place_order(customer.id, vec![line(MONITOR, 1)])
            .await?;
        expect_state(&pending, OrderState::PaymentPending)?;
        let cancelled = self.cancel(pending.id()).await?;
        expect_state(&cancelled, OrderState::Cancelled)?;

        let shipped = self
            .place_order(customer.id, vec![line(MONITOR, 1)])
            .await?;
        let shipped = self.pay(shipped.id()).await?;
        match self.cancel(shipped.id()).await {
            Err(SagaError::TooLateToCancel { .. }) => {}
            Ok(order) => {
                return Err(SagaError::ScenarioCheck(format!(
                    "order {} was cancelled after dispatch",
                    order.id()
                )));
            }
            Err(error) => return Err(error),
        }
        let shipped = self.order(shipped.id()).await?;
        expect_state(&shipped, OrderState::Shipped)?;

        outcome.customers.push(customer);
        outcome.orders.extend([cancelled, shipped]);
        Ok(())
    }

    async fn run_return(
        &self,
        outcome: &mut ScenarioOutcome,
        resolution: ReturnResolution,
    ) -> Result<()> {
        let customer = self.create_customer("Barbara", "Boston").await?;
        let order = self
            .place_order(customer.id, vec![line(KEYBOARD, 1), line(HEADSET, 1)])
            .await?;
        let order = self.pay(order.id()).await?;
        expect_state(&order, OrderState::Shipped)?;

        let order = self
            .process_return(order.id(), ProductId::new(KEYBOARD), resolution)
            .await?;
        let expected = match resolution {
            ReturnResolution::Replacement => OrderState::ReplacementShipped,
            ReturnResolution::Refund => OrderState::PartiallyRefunded,
        };
        expect_state(&order, expected)?;

        outcome.customers.push(customer);
        outcome.orders.push(order);
        Ok(())
    }

    /// Delivers stock after `delay`, then tells the waiting order.
    fn spawn_supplier(
        &self,
        order_id: OrderId,
        delivery: SupplierDelivery,
        delay: Duration,
    ) -> JoinHandle<Result<OrderSaga>> {
        let orchestrator = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let arrival = StockArrival::new(delivery.product_id.clone(), delivery.supplier.clone());
            let level = orchestrator.book_delivery(delivery).await?;
            tracing::info!(
                %order_id,
                product_id = %arrival.product_id,
                supplier = %arrival.supplier,
                stock_level = level,
                "supplier delivered"
            );
            orchestrator.notify_stock_arrival(order_id, arrival).await
        })
    }

    async fn collect_payments(&self, outcome: &mut ScenarioOutcome) -> Result<()> {
        for payment_id in outcome.orders.iter().filter_map(OrderSaga::payment_id) {
            outcome.payments.push(self.get_payment(payment_id).await?);
        }
        Ok(())
    }
}
