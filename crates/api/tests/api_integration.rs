//! Integration tests for the API server.

use std::sync::OnceLock;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use services::ServiceHost;
use tower::ServiceExt;

use api::config::Config;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

async fn setup() -> (axum::Router, Vec<ServiceHost>) {
    let (state, hosts) = api::create_default_state(&Config::default())
        .await
        .unwrap();
    (api::create_app(state, get_metrics_handle()), hosts)
}

async fn send(app: &axum::Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

async fn body_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn create_customer(app: &axum::Router, name: &str) -> u64 {
    let response = send(
        app,
        post_json("/customers", json!({ "name": name, "address": "Lisbon" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["id"].as_u64().unwrap()
}

async fn place_order(app: &axum::Router, customer_id: u64, items: Value) -> Value {
    let response = send(
        app,
        post_json(
            "/orders",
            json!({ "customer_id": customer_id, "items": items }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

#[tokio::test]
async fn test_health_reports_every_service() {
    let (app, _hosts) = setup().await;

    let response = send(&app, get("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["services"]["customer"], api::CUSTOMER_ADDRESS);
    assert_eq!(json["services"]["payment"], api::PAYMENT_ADDRESS);
    assert_eq!(json["services"]["inventory"], api::INVENTORY_ADDRESS);
    assert_eq!(json["services"]["shipping"], api::SHIPPING_ADDRESS);
}

#[tokio::test(start_paused = true)]
async fn test_health_degrades_once_a_lease_lapses() {
    let (app, mut hosts) = setup().await;

    let shipping = hosts.pop().unwrap();
    assert_eq!(shipping.address(), api::SHIPPING_ADDRESS);
    shipping.stop().await;

    // The dead address stays registered until its lease runs out.
    let json = body_json(send(&app, get("/health")).await).await;
    assert_eq!(json["status"], "ok");

    tokio::time::sleep(Config::default().lease_ttl + Duration::from_secs(1)).await;

    let json = body_json(send(&app, get("/health")).await).await;
    assert_eq!(json["status"], "degraded");
    assert!(json["services"]["shipping"].is_null());
    assert_eq!(json["services"]["customer"], api::CUSTOMER_ADDRESS);
}

#[tokio::test]
async fn test_list_scenarios() {
    let (app, _hosts) = setup().await;

    let json = body_json(send(&app, get("/scenarios")).await).await;
    let names: Vec<&str> = json["scenarios"]
        .as_array()
        .unwrap()
        .iter()
        .map(|name| name.as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        [
            "direct",
            "in-stock",
            "partial-stock",
            "cancel",
            "return-replacement",
            "return-refund"
        ]
    );
}

#[tokio::test]
async fn test_run_in_stock_scenario() {
    let (app, _hosts) = setup().await;

    let response = send(&app, post("/scenarios/in-stock")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["scenario"], "in-stock");
    assert_eq!(json["orders"][0]["state"], "Shipped");
    assert!(json["orders"][0]["tracking_number"].is_string());
    assert_eq!(json["payments"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_run_scenario_by_alias() {
    let (app, _hosts) = setup().await;

    let json = body_json(send(&app, post("/scenarios/s5")).await).await;
    assert_eq!(json["scenario"], "return-refund");
    assert_eq!(json["orders"][0]["state"], "PartiallyRefunded");
}

#[tokio::test]
async fn test_run_unknown_scenario_is_not_found() {
    let (app, _hosts) = setup().await;

    let response = send(&app, post("/scenarios/s9")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("s9"));
}

#[tokio::test]
async fn test_customer_round_trip() {
    let (app, _hosts) = setup().await;
    let id = create_customer(&app, "Ada").await;

    let response = send(&app, get(&format!("/customers/{id}"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["name"], "Ada");
    assert_eq!(json["address"], "Lisbon");
}

#[tokio::test]
async fn test_create_customer_without_name() {
    let (app, _hosts) = setup().await;

    let response = send(
        &app,
        post_json("/customers", json!({ "name": " ", "address": "Lisbon" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_unknown_customer() {
    let (app, _hosts) = setup().await;

    let response = send(&app, get("/customers/999")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_order_pay_flow() {
    let (app, _hosts) = setup().await;
    let customer_id = create_customer(&app, "Ada").await;

    let order = place_order(
        &app,
        customer_id,
        json!([
            { "product_id": "SKU-KEYBOARD", "quantity": 1, "unit_price_cents": 5000 },
            { "product_id": "SKU-MOUSE", "quantity": 2, "unit_price_cents": 1999 }
        ]),
    )
    .await;
    assert_eq!(order["state"], "PaymentPending");
    assert_eq!(order["total_cents"], 8998);
    assert!(order["reservation_id"].is_string());
    let id = order["id"].as_u64().unwrap();

    let response = send(&app, post(&format!("/orders/{id}/pay"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let order = body_json(response).await;
    assert_eq!(order["state"], "Shipped");
    assert!(order["tracking_number"].is_string());

    let orders = body_json(send(&app, get("/orders")).await).await;
    assert_eq!(orders.as_array().unwrap().len(), 1);
    assert_eq!(orders[0]["id"], id);
}

#[tokio::test]
async fn test_order_waits_for_stock_arrival() {
    let (app, _hosts) = setup().await;
    let customer_id = create_customer(&app, "Grace").await;

    let order = place_order(
        &app,
        customer_id,
        json!([{ "product_id": "SKU-DOCK", "quantity": 1, "unit_price_cents": 8990 }]),
    )
    .await;
    assert_eq!(order["state"], "AwaitingStock");
    assert_eq!(order["awaiting"], json!(["SKU-DOCK"]));
    let id = order["id"].as_u64().unwrap();

    // Paying before the stock is reserved is rejected.
    let response = send(&app, post(&format!("/orders/{id}/pay"))).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = send(
        &app,
        post_json(
            &format!("/orders/{id}/stock-arrivals"),
            json!({ "product_id": "SKU-DOCK", "quantity": 3, "supplier": "Supplier A" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let order = body_json(response).await;
    assert_eq!(order["state"], "PaymentPending");
    assert_eq!(order["awaiting"], json!([]));
}

#[tokio::test]
async fn test_cancel_after_shipping_conflicts() {
    let (app, _hosts) = setup().await;
    let customer_id = create_customer(&app, "Linus").await;

    let order = place_order(
        &app,
        customer_id,
        json!([{ "product_id": "SKU-MONITOR", "quantity": 1, "unit_price_cents": 19900 }]),
    )
    .await;
    let id = order["id"].as_u64().unwrap();

    send(&app, post(&format!("/orders/{id}/pay"))).await;
    let response = send(&app, post(&format!("/orders/{id}/cancel"))).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let order = body_json(send(&app, get(&format!("/orders/{id}"))).await).await;
    assert_eq!(order["state"], "Shipped");
}

#[tokio::test]
async fn test_cancel_pending_order() {
    let (app, _hosts) = setup().await;
    let customer_id = create_customer(&app, "Linus").await;

    let order = place_order(
        &app,
        customer_id,
        json!([{ "product_id": "SKU-MONITOR", "quantity": 1, "unit_price_cents": 19900 }]),
    )
    .await;
    let id = order["id"].as_u64().unwrap();

    let response = send(&app, post(&format!("/orders/{id}/cancel"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let order = body_json(response).await;
    assert_eq!(order["state"], "Cancelled");
    assert!(order["reservation_id"].is_null());
}

#[tokio::test]
async fn test_return_with_refund() {
    let (app, _hosts) = setup().await;
    let customer_id = create_customer(&app, "Barbara").await;

    let order = place_order(
        &app,
        customer_id,
        json!([
            { "product_id": "SKU-KEYBOARD", "quantity": 1, "unit_price_cents": 5000 },
            { "product_id": "SKU-HEADSET", "quantity": 1, "unit_price_cents": 5000 }
        ]),
    )
    .await;
    let id = order["id"].as_u64().unwrap();
    send(&app, post(&format!("/orders/{id}/pay"))).await;

    let response = send(
        &app,
        post_json(
            &format!("/orders/{id}/returns"),
            json!({ "product_id": "SKU-KEYBOARD", "resolution": "Refund" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let order = body_json(response).await;
    assert_eq!(order["state"], "PartiallyRefunded");
    assert_eq!(order["refunded_cents"], 5000);
}

#[tokio::test]
async fn test_return_of_product_not_in_order() {
    let (app, _hosts) = setup().await;
    let customer_id = create_customer(&app, "Barbara").await;

    let order = place_order(
        &app,
        customer_id,
        json!([{ "product_id": "SKU-KEYBOARD", "quantity": 1, "unit_price_cents": 5000 }]),
    )
    .await;
    let id = order["id"].as_u64().unwrap();
    send(&app, post(&format!("/orders/{id}/pay"))).await;

    let response = send(
        &app,
        post_json(
            &format!("/orders/{id}/returns"),
            json!({ "product_id": "SKU-WEBCAM", "resolution": "Replacement" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_get_nonexistent_order() {
    let (app, _hosts) = setup().await;

    let response = send(&app, get("/orders/4242")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_order_with_overflowing_total_is_rejected() {
    let (app, _hosts) = setup().await;
    let customer_id = create_customer(&app, "Ada").await;

    let response = send(
        &app,
        post_json(
            "/orders",
            json!({
                "customer_id": customer_id,
                "items": [
                    { "product_id": "SKU-MOUSE", "quantity": 2, "unit_price_cents": i64::MAX / 2 + 1 }
                ]
            }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let orders = body_json(send(&app, get("/orders")).await).await;
    assert!(orders.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_stock_arrival_overflow_is_rejected() {
    let (app, _hosts) = setup().await;
    let customer_id = create_customer(&app, "Grace").await;

    let order = place_order(
        &app,
        customer_id,
        json!([{ "product_id": "SKU-DOCK", "quantity": 1, "unit_price_cents": 8990 }]),
    )
    .await;
    let id = order["id"].as_u64().unwrap();
    let arrivals = format!("/orders/{id}/stock-arrivals");

    let response = send(
        &app,
        post_json(
            &arrivals,
            json!({ "product_id": "SKU-WEBCAM", "quantity": u32::MAX, "supplier": "Supplier A" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &app,
        post_json(
            &arrivals,
            json!({ "product_id": "SKU-WEBCAM", "quantity": 1, "supplier": "Supplier B" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let order = body_json(send(&app, get(&format!("/orders/{id}"))).await).await;
    assert_eq!(order["state"], "AwaitingStock");
}

#[tokio::test]
async fn test_invalid_order_id_format() {
    let (app, _hosts) = setup().await;

    let response = send(&app, get("/orders/not-a-number")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _hosts) = setup().await;

    send(&app, post("/scenarios/in-stock")).await;

    let response = send(&app, get("/metrics")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("scenario_runs_total"));
}
