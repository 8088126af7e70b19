//! Payment service: the monetary leg of an order.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{Money, OrderId, PaymentId};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use crate::error::{Result, ServiceError};

/// The state of a payment record.
///
/// State transitions:
/// ```text
/// Created ──► Paid ──► Deleted
///    └─────────────────► Deleted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentState {
    /// Awaiting the charge.
    Created,

    /// Charged for exactly the recorded value.
    Paid,

    /// Removed from lookup (terminal state).
    Deleted,
}

impl PaymentState {
    /// Returns true if the payment can be charged in this state.
    pub fn can_pay(&self) -> bool {
        matches!(self, PaymentState::Created)
    }

    /// Returns true if a partial refund can be applied in this state.
    pub fn can_refund(&self) -> bool {
        matches!(self, PaymentState::Paid)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentState::Created => "Created",
            PaymentState::Paid => "Paid",
            PaymentState::Deleted => "Deleted",
        }
    }
}

impl std::fmt::Display for PaymentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A payment record owned by the payment service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub value: Money,
    pub state: PaymentState,
}

/// Remote surface of the payment service.
#[async_trait]
pub trait PaymentService: Send + Sync {
    /// Creates a payment for `order_id` over `value`.
    async fn create(&self, order_id: OrderId, value: Money) -> Result<Payment>;

    /// Returns the payment with the given ID.
    async fn get(&self, id: PaymentId) -> Result<Payment>;

    /// Charges the payment; `value` must equal the recorded value.
    async fn pay(&self, id: PaymentId, value: Money) -> Result<Payment>;

    /// Removes the payment, returning its last known values.
    async fn delete(&self, id: PaymentId) -> Result<Payment>;

    /// Reduces the recorded value of a paid payment by `amount`.
    async fn refund(&self, id: PaymentId, amount: Money) -> Result<Payment>;
}

type Record = Arc<Mutex<Payment>>;

#[derive(Debug, Default)]
struct InMemoryPaymentState {
    records: HashMap<PaymentId, Record>,
    last_id: u32,
}

/// In-memory payment service.
///
/// Each record sits behind its own mutex: operations on one payment are
/// serialized, operations on different payments only share the map lock for
/// the lookup.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentService {
    state: Arc<RwLock<InMemoryPaymentState>>,
}

impl InMemoryPaymentService {
    /// Creates a new in-memory payment service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of live (non-deleted) payments.
    pub async fn payment_count(&self) -> usize {
        self.state.read().await.records.len()
    }

    /// Returns every live payment for `order_id`.
    pub async fn payments_for_order(&self, order_id: OrderId) -> Vec<Payment> {
        let records: Vec<Record> = self.state.read().await.records.values().cloned().collect();
        let mut payments = Vec::new();
        for record in records {
            let payment = record.lock().await;
            if payment.order_id == order_id {
                payments.push(payment.clone());
            }
        }
        payments.sort_by_key(|p| p.id);
        payments
    }

    async fn record(&self, id: PaymentId) -> Result<Record> {
        self.state
            .read()
            .await
            .records
            .get(&id)
            .cloned()
            .ok_or_else(|| ServiceError::not_found("Payment", id))
    }
}

#[async_trait]
impl PaymentService for InMemoryPaymentService {
    #[tracing::instrument(skip(self))]
    async fn create(&self, order_id: OrderId, value: Money) -> Result<Payment> {
        if value.is_negative() {
            return Err(ServiceError::InvalidValue { value });
        }

        let mut state = self.state.write().await;
        state.last_id += 1;
        let payment = Payment {
            id: PaymentId::new(state.last_id),
            order_id,
            value,
            state: PaymentState::Created,
        };
        state
            .records
            .insert(payment.id, Arc::new(Mutex::new(payment.clone())));

        metrics::counter!("payments_created_total").increment(1);
        tracing::info!(payment_id = %payment.id, %order_id, %value, "created payment");
        Ok(payment)
    }

    async fn get(&self, id: PaymentId) -> Result<Payment> {
        let record = self.record(id).await?;
        let payment = record.lock().await;
        if payment.state == PaymentState::Deleted {
            return Err(ServiceError::not_found("Payment", id));
        }
        Ok(payment.clone())
    }

    #[tracing::instrument(skip(self))]
    async fn pay(&self, id: PaymentId, value: Money) -> Result<Payment> {
        let record = self.record(id).await?;
        let mut payment = record.lock().await;

        match payment.state {
            PaymentState::Created => {}
            PaymentState::Paid => return Err(ServiceError::AlreadyPaid { id }),
            // Deleted between lookup and lock.
            PaymentState::Deleted => return Err(ServiceError::not_found("Payment", id)),
        }
        if payment.value != value {
            return Err(ServiceError::AmountMismatch {
                id,
                expected: payment.value,
                actual: value,
            });
        }

        payment.state = PaymentState::Paid;
        tracing::info!(payment_id = %id, %value, "paid payment");
        Ok(payment.clone())
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: PaymentId) -> Result<Payment> {
        let record = self
            .state
            .write()
            .await
            .records
            .remove(&id)
            .ok_or_else(|| ServiceError::not_found("Payment", id))?;

        let mut payment = record.lock().await;
        payment.state = PaymentState::Deleted;
        tracing::info!(payment_id = %id, "deleted payment");
        Ok(payment.clone())
    }

    #[tracing::instrument(skip(self))]
    async fn refund(&self, id: PaymentId, amount: Money) -> Result<Payment> {
        if amount.is_negative() {
            return Err(ServiceError::InvalidValue { value: amount });
        }

        let record = self.record(id).await?;
        let mut payment = record.lock().await;

        if payment.state == PaymentState::Deleted {
            return Err(ServiceError::not_found("Payment", id));
        }
        if !payment.state.can_refund() {
            return Err(ServiceError::NotPaid {
                id,
                state: payment.state,
            });
        }

        let remaining =
            payment
                .value
                .checked_sub(amount)
                .ok_or(ServiceError::RefundExceedsValue {
                    id,
                    value: payment.value,
                    refund: amount,
                })?;

        payment.value = remaining;
        tracing::info!(payment_id = %id, refund = %amount, %remaining, "refunded payment");
        Ok(payment.clone())
    }
}
