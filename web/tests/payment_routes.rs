//! HTTP contract of the payment proxy.

#![allow(clippy::unwrap_used)]

use axum::http::{HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{Value, json};
use std::sync::Arc;
use storefront_web::signature;
use storefront_web::{AppState, MockPaymentGateway, REQUEST_ID_HEADER, build_router};

const SECRET: &str = "test_secret";

fn server_with(gateway: &MockPaymentGateway, secret: Option<&str>) -> TestServer {
    let state = AppState::new(Arc::new(gateway.clone()));
    let state = match secret {
        Some(secret) => state.with_verification_secret(secret),
        None => state,
    };
    TestServer::new(build_router(state)).unwrap()
}

fn server() -> (TestServer, MockPaymentGateway) {
    let gateway = MockPaymentGateway::new();
    (server_with(&gateway, Some(SECRET)), gateway)
}

#[tokio::test]
async fn create_order_converts_major_units() {
    let (server, gateway) = server();

    let response = server
        .post("/api/razorpay/create-order")
        .json(&json!({ "amount": 1499.99 }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["orderId"], json!("order_mock_1"));
    assert_eq!(body["amount"], json!(149_999));
    assert_eq!(body["currency"], json!("INR"));

    let requests = gateway.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].amount, 149_999);
}

#[tokio::test]
async fn create_order_passes_currency_through() {
    let (server, gateway) = server();

    let response = server
        .post("/api/razorpay/create-order")
        .json(&json!({ "amount": 20, "currency": "USD" }))
        .await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["currency"], json!("USD"));
    assert_eq!(gateway.requests()[0].amount, 2_000);
}

#[tokio::test]
async fn create_order_rejects_bad_amounts_without_calling_the_gateway() {
    let (server, gateway) = server();

    for body in [
        json!({}),
        json!({ "amount": 0 }),
        json!({ "amount": -5 }),
        json!({ "amount": 0.001 }),
        json!({ "amount": "ten" }),
    ] {
        let response = server.post("/api/razorpay/create-order").json(&body).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(response.json::<Value>()["error"].is_string(), "body {body}");
    }

    assert!(gateway.requests().is_empty());
}

#[tokio::test]
async fn create_order_reports_gateway_failures_as_500() {
    let (server, gateway) = server();
    gateway.fail_with(Some("Authentication failed"));

    let response = server
        .post("/api/razorpay/create-order")
        .json(&json!({ "amount": 100 }))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["error"], json!("Authentication failed"));
    assert_eq!(body["code"], json!("GATEWAY_ERROR"));
}

#[tokio::test]
async fn verify_payment_accepts_a_valid_signature() {
    let (server, _) = server();
    let signature = signature::sign(SECRET, "order_1", "pay_1").unwrap();

    let response = server
        .post("/api/razorpay/verify-payment")
        .json(&json!({
            "razorpay_order_id": "order_1",
            "razorpay_payment_id": "pay_1",
            "razorpay_signature": signature,
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["paymentId"], json!("pay_1"));
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn verify_payment_rejects_a_tampered_signature() {
    let (server, _) = server();
    let signature = signature::sign(SECRET, "order_1", "pay_1").unwrap();

    let response = server
        .post("/api/razorpay/verify-payment")
        .json(&json!({
            "razorpay_order_id": "order_1",
            "razorpay_payment_id": "pay_2",
            "razorpay_signature": signature,
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], json!("Invalid payment signature"));
}

#[tokio::test]
async fn verify_payment_requires_every_field() {
    let (server, _) = server();

    let response = server
        .post("/api/razorpay/verify-payment")
        .json(&json!({ "razorpay_order_id": "order_1", "razorpay_signature": "abc" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn verify_payment_without_a_secret_is_a_server_error() {
    let gateway = MockPaymentGateway::new();
    let server = server_with(&gateway, None);

    let response = server
        .post("/api/razorpay/verify-payment")
        .json(&json!({
            "razorpay_order_id": "order_1",
            "razorpay_payment_id": "pay_1",
            "razorpay_signature": "00",
        }))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let (server, _) = server();

    let response = server
        .get("/health")
        .add_header(REQUEST_ID_HEADER.clone(), HeaderValue::from_static("trace-me"))
        .await;

    response.assert_status_ok();
    response.assert_text("ok");
    assert_eq!(response.header(REQUEST_ID_HEADER.clone()), "trace-me");
}

#[tokio::test]
async fn readiness_and_metrics_endpoints() {
    let (server, _) = server();

    let ready = server.get("/health/ready").await;
    ready.assert_status_ok();
    assert_eq!(ready.json::<Value>()["status"], json!("Healthy"));

    // No recorder installed in this state
    server
        .get("/metrics")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);

    let gateway = MockPaymentGateway::new();
    let state = AppState::new(Arc::new(gateway))
        .with_metrics(storefront_runtime::telemetry::detached_handle());
    let with_metrics = TestServer::new(build_router(state)).unwrap();
    with_metrics.get("/metrics").await.assert_status_ok();
}
