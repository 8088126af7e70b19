//! Order saga endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{CustomerId, Money, OrderId, OrderItem, ProductId};
use saga::{OrderSaga, ReturnResolution, StockArrival};
use serde::{Deserialize, Serialize};
use services::SupplierDelivery;

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub customer_id: u32,
    pub items: Vec<OrderItemRequest>,
}

#[derive(Deserialize)]
pub struct OrderItemRequest {
    pub product_id: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

#[derive(Deserialize)]
pub struct StockArrivalRequest {
    pub product_id: String,
    pub quantity: u32,
    pub supplier: String,
}

#[derive(Deserialize)]
pub struct ReturnRequest {
    pub product_id: String,
    pub resolution: ReturnResolution,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: u32,
    pub customer_id: u32,
    pub state: String,
    pub items: Vec<OrderItemResponse>,
    pub total_cents: i64,
    pub awaiting: Vec<String>,
    pub reservation_id: Option<String>,
    pub payment_id: Option<u32>,
    pub tracking_number: Option<String>,
    pub replacement_tracking_number: Option<String>,
    pub refunded_cents: Option<i64>,
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

impl From<&OrderSaga> for OrderResponse {
    fn from(order: &OrderSaga) -> Self {
        Self {
            id: order.id().value(),
            customer_id: order.customer_id().value(),
            state: order.state().to_string(),
            items: order
                .items()
                .iter()
                .map(|item| OrderItemResponse {
                    product_id: item.product_id.to_string(),
                    quantity: item.quantity,
                    unit_price_cents: item.unit_price.cents(),
                })
                .collect(),
            total_cents: order.total().cents(),
            awaiting: order.awaiting().map(ToString::to_string).collect(),
            reservation_id: order.reservation_id().map(str::to_owned),
            payment_id: order.payment_id().map(|id| id.value()),
            tracking_number: order.tracking_number().map(str::to_owned),
            replacement_tracking_number: order.replacement_tracking_number().map(str::to_owned),
            refunded_cents: order.refunded().map(|amount| amount.cents()),
        }
    }
}

// -- Handlers --

/// POST /orders: places an order and reserves what is in stock.
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let mut items = Vec::with_capacity(req.items.len());
    for item in req.items {
        if item.unit_price_cents < 0 {
            return Err(ApiError::BadRequest(format!(
                "Negative price for {}",
                item.product_id
            )));
        }
        items.push(OrderItem::new(
            item.product_id,
            item.quantity,
            Money::from_cents(item.unit_price_cents),
        ));
    }

    let order = state
        .orchestrator
        .place_order(CustomerId::new(req.customer_id), items)
        .await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::from(&order))))
}

/// GET /orders: lists every order.
pub async fn list(State(state): State<Arc<AppState>>) -> Json<Vec<OrderResponse>> {
    let orders = state.orchestrator.orders().await;
    Json(orders.iter().map(OrderResponse::from).collect())
}

/// GET /orders/{id}: returns the saga view of an order.
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let id = parse_order_id(&id)?;
    let order = state.orchestrator.order(id).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/{id}/pay: charges the payment and ships.
pub async fn pay(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let id = parse_order_id(&id)?;
    let order = state.orchestrator.pay(id).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/{id}/ship: retries the shipment of a paid order.
pub async fn ship(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let id = parse_order_id(&id)?;
    let order = state.orchestrator.ship(id).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/{id}/cancel: cancels an order before dispatch.
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let id = parse_order_id(&id)?;
    let order = state.orchestrator.cancel(id).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/{id}/stock-arrivals: books a supplier delivery into stock
/// and reports it to the waiting order.
pub async fn stock_arrival(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<StockArrivalRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let id = parse_order_id(&id)?;
    let delivery = SupplierDelivery::new(req.product_id.as_str(), req.quantity, req.supplier.as_str());
    state.orchestrator.book_delivery(delivery).await?;

    let order = state
        .orchestrator
        .notify_stock_arrival(id, StockArrival::new(req.product_id, req.supplier))
        .await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/{id}/returns: takes back a defective item.
pub async fn process_return(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ReturnRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let id = parse_order_id(&id)?;
    let order = state
        .orchestrator
        .process_return(id, ProductId::new(req.product_id), req.resolution)
        .await?;
    Ok(Json(OrderResponse::from(&order)))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    id.parse::<u32>()
        .map(OrderId::new)
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))
}
