mod common;

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use chrono::Utc;
use common::{JWT_SECRET, KEY_SECRET, TestApp};
use petcare_api::{
    config::ConsistencyMode,
    middleware::auth::{Claims, JwtAuthorizer},
    routes::app_router,
};
use serde_json::{Value, json};
use tower::ServiceExt;

fn bearer(uid: &str, admin: bool) -> String {
    let token = JwtAuthorizer::new(JWT_SECRET)
        .sign(&Claims {
            sub: uid.into(),
            phone_number: None,
            admin,
            exp: (Utc::now().timestamp() + 600) as usize,
        })
        .expect("sign token");
    format!("Bearer {token}")
}

async fn call(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app_router(app.state.clone())
        .oneshot(request)
        .await
        .expect("router responds");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("request")
}

fn send_json(method: &str, uri: &str, auth: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

#[tokio::test]
async fn slot_listing_needs_a_date() {
    let app = TestApp::new(ConsistencyMode::BestEffort);

    let (status, body) = call(&app, get("/api/appointments/available-slots")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Date is required");

    let (status, body) = call(
        &app,
        get("/api/booking/slots?date=2025-12-01&serviceType=daycare"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["availableSlots"], json!(["08:00", "09:00", "10:00"]));
    assert_eq!(body["data"]["bookedSlots"], json!([]));
}

#[tokio::test]
async fn protected_routes_require_a_bearer_token() {
    let app = TestApp::new(ConsistencyMode::BestEffort);

    let payload = json!({ "serviceType": "checkup", "date": "2025-12-01", "time": "10:00" });
    let (status, _) = call(
        &app,
        send_json("POST", "/api/appointments", None, payload.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(
        &app,
        send_json("POST", "/api/appointments", Some("Bearer garbage"), payload),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn appointment_is_created_over_http() {
    let app = TestApp::new(ConsistencyMode::BestEffort);
    let auth = bearer("u1", false);

    let payload = json!({
        "serviceType": "checkup",
        "date": "2025-12-01",
        "time": "10:00",
        "petName": "Bruno",
    });
    let (status, body) = call(
        &app,
        send_json("POST", "/api/appointments", Some(&auth), payload.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["petName"], "Bruno");
    assert_eq!(body["data"]["userId"], "u1");

    let (status, body) = call(
        &app,
        send_json("POST", "/api/appointments", Some(&auth), payload),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Time slot 10:00 on 2025-12-01 is already booked");

    let (status, _) = call(
        &app,
        Request::builder()
            .uri("/api/appointments")
            .header(header::AUTHORIZATION, &auth)
            .body(Body::empty())
            .expect("request"),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn tampered_payment_callback_is_a_400() {
    let app = TestApp::new(ConsistencyMode::BestEffort);
    let auth = bearer("u1", false);

    let mut signature = petcare_api::payment::signature::sign(KEY_SECRET, "order_1", "pay_1");
    signature.push('0');
    let payload = json!({
        "razorpay_order_id": "order_1",
        "razorpay_payment_id": "pay_1",
        "razorpay_signature": signature,
    });
    let (status, body) = call(
        &app,
        send_json("POST", "/api/payment/verify", Some(&auth), payload),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"]["success"], false);

    let good = petcare_api::payment::signature::sign(KEY_SECRET, "order_1", "pay_1");
    let payload = json!({
        "razorpay_order_id": "order_1",
        "razorpay_payment_id": "pay_1",
        "razorpay_signature": good,
    });
    let (status, body) = call(
        &app,
        send_json("POST", "/api/payment/verify", Some(&auth), payload),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["success"], true);
}

#[tokio::test]
async fn unknown_paths_get_a_json_404() {
    let app = TestApp::new(ConsistencyMode::BestEffort);
    let (status, body) = call(&app, get("/api/nothing-here")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["data"]["path"], "/api/nothing-here");
}

#[tokio::test]
async fn missing_product_is_a_404() {
    let app = TestApp::new(ConsistencyMode::BestEffort);
    let (status, body) = call(&app, get("/api/products/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Product not found");
}
