mod common;

use common::{KEY_SECRET, TestApp};
use petcare_api::{
    config::ConsistencyMode,
    dto::{
        orders::{CreateOrderRequest, OrderLineRequest},
        payment::{
            CreatePaymentOrderRequest, RefundRequest, ServicePaymentRequest, VerifyPaymentRequest,
            VerifyServicePaymentRequest,
        },
        schedule::CreateScheduleRequest,
    },
    error::AppError,
    lifecycle::{OrderStatus, PaymentStatus, ScheduleStatus},
    models::{Appointment, Order, ShippingAddress},
    payment::signature,
    services::{appointment_service, order_service, payment_service},
};
use serde_json::json;

async fn place_order(app: &TestApp, user: &petcare_api::middleware::auth::AuthUser) -> Order {
    app.product("p1", 120.0, 10).await;
    order_service::create_order(
        &app.state,
        user,
        CreateOrderRequest {
            items: vec![OrderLineRequest {
                product_id: "p1".into(),
                quantity: 1,
            }],
            shipping_address: Some(ShippingAddress::default()),
            payment_method: "razorpay".into(),
        },
    )
    .await
    .expect("order placed")
    .data
    .expect("order")
}

fn callback(order_id: &str, signature: String) -> VerifyPaymentRequest {
    VerifyPaymentRequest {
        razorpay_order_id: "order_rzp_1".into(),
        razorpay_payment_id: "pay_rzp_1".into(),
        razorpay_signature: signature,
        order_id: Some(order_id.to_string()),
    }
}

#[tokio::test]
async fn tampered_signature_marks_order_payment_failed() -> anyhow::Result<()> {
    let app = TestApp::new(ConsistencyMode::BestEffort);
    let user = app.user("u1", "", "").await;
    let order = place_order(&app, &user).await;

    let mut forged = signature::sign(KEY_SECRET, "order_rzp_1", "pay_rzp_1");
    forged.replace_range(0..1, if forged.starts_with('0') { "1" } else { "0" });

    let resp = payment_service::verify_payment(
        &app.state,
        &user,
        callback(&order.id, forged),
    )
    .await?;
    let outcome = resp.data.expect("verification");
    assert!(!outcome.success);
    assert_eq!(outcome.message, "Invalid payment signature");

    let stored = order_service::get_order(&app.state, &user, &order.id)
        .await?
        .data
        .expect("order");
    assert_eq!(stored.payment_status, PaymentStatus::Failed);
    assert_eq!(stored.order_status, OrderStatus::Pending);
    Ok(())
}

#[tokio::test]
async fn valid_signature_confirms_order() -> anyhow::Result<()> {
    let app = TestApp::new(ConsistencyMode::BestEffort);
    let user = app.user("u1", "", "").await;
    let order = place_order(&app, &user).await;

    let good = signature::sign(KEY_SECRET, "order_rzp_1", "pay_rzp_1");
    let resp = payment_service::verify_payment(&app.state, &user, callback(&order.id, good)).await?;
    let outcome = resp.data.expect("verification");
    assert!(outcome.success);
    assert_eq!(outcome.payment_id.as_deref(), Some("pay_rzp_1"));

    let stored = order_service::get_order(&app.state, &user, &order.id)
        .await?
        .data
        .expect("order");
    assert_eq!(stored.payment_status, PaymentStatus::Completed);
    assert_eq!(stored.order_status, OrderStatus::Confirmed);
    assert_eq!(stored.payment_id.as_deref(), Some("pay_rzp_1"));
    Ok(())
}

#[tokio::test]
async fn verification_requires_ownership_and_fields() -> anyhow::Result<()> {
    let app = TestApp::new(ConsistencyMode::BestEffort);
    let owner = app.user("u1", "", "").await;
    let stranger = app.user("u2", "", "").await;
    let order = place_order(&app, &owner).await;

    let good = signature::sign(KEY_SECRET, "order_rzp_1", "pay_rzp_1");
    let err = payment_service::verify_payment(&app.state, &stranger, callback(&order.id, good))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let err = payment_service::verify_payment(
        &app.state,
        &owner,
        callback(&order.id, String::new()),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    Ok(())
}

#[tokio::test]
async fn payment_order_amount_is_sent_in_minor_units() -> anyhow::Result<()> {
    let app = TestApp::new(ConsistencyMode::BestEffort);
    let user = app.user("u1", "", "").await;

    let resp = payment_service::create_payment_order(
        &app.state,
        &user,
        CreatePaymentOrderRequest {
            amount: 499.99,
            currency: "INR".into(),
            receipt: Some("r-1".into()),
        },
    )
    .await?
    .data
    .expect("payment order");
    assert_eq!(resp.order.amount, 49999);
    assert_eq!(resp.key_id, "rzp_test_key");

    let err = payment_service::create_payment_order(
        &app.state,
        &user,
        CreatePaymentOrderRequest {
            amount: 0.0,
            currency: "INR".into(),
            receipt: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    Ok(())
}

async fn book(app: &TestApp, user: &petcare_api::middleware::auth::AuthUser) -> Appointment {
    appointment_service::create_appointment(
        &app.state,
        user,
        CreateScheduleRequest {
            service_type: "checkup".into(),
            date: "2025-12-01".into(),
            time: "11:00".into(),
            ..Default::default()
        },
    )
    .await
    .expect("appointment created")
    .data
    .expect("appointment")
}

#[tokio::test]
async fn service_payment_round_trip() -> anyhow::Result<()> {
    let app = TestApp::new(ConsistencyMode::BestEffort);
    let user = app.user("u1", "", "").await;
    let appointment = book(&app, &user).await;

    let opened = payment_service::create_service_payment(
        &app.state,
        &user,
        ServicePaymentRequest {
            appointment_id: appointment.id.clone(),
            amount: 500.0,
            description: Some("Consultation fee".into()),
        },
    )
    .await?
    .data
    .expect("service payment");
    assert_eq!(opened.order.amount, 50000);
    assert_eq!(
        opened.order.receipt.as_deref(),
        Some(format!("appointment_{}", appointment.id).as_str())
    );

    let stored = appointment_service::get_appointment(&app.state, &user, &appointment.id)
        .await?
        .data
        .expect("appointment");
    assert_eq!(stored.payment_order_id.as_deref(), Some(opened.order.id.as_str()));
    assert_eq!(stored.payment_status, Some(PaymentStatus::Pending));

    let good = signature::sign(KEY_SECRET, &opened.order.id, "pay_fee_1");
    let outcome = payment_service::verify_service_payment(
        &app.state,
        &user,
        VerifyServicePaymentRequest {
            razorpay_order_id: opened.order.id.clone(),
            razorpay_payment_id: "pay_fee_1".into(),
            razorpay_signature: good.clone(),
            appointment_id: appointment.id.clone(),
        },
    )
    .await?
    .data
    .expect("verification");
    assert!(outcome.success);

    let stored = appointment_service::get_appointment(&app.state, &user, &appointment.id)
        .await?
        .data
        .expect("appointment");
    assert_eq!(stored.status, ScheduleStatus::Confirmed);
    assert_eq!(stored.payment_status, Some(PaymentStatus::Completed));
    assert_eq!(stored.payment_id.as_deref(), Some("pay_fee_1"));
    assert_eq!(
        stored.payment_details,
        Some(json!({
            "razorpay_order_id": opened.order.id,
            "razorpay_payment_id": "pay_fee_1",
            "razorpay_signature": good,
        }))
    );
    Ok(())
}

#[tokio::test]
async fn service_signature_mismatch_leaves_status_alone() -> anyhow::Result<()> {
    let app = TestApp::new(ConsistencyMode::BestEffort);
    let user = app.user("u1", "", "").await;
    let appointment = book(&app, &user).await;

    let outcome = payment_service::verify_service_payment(
        &app.state,
        &user,
        VerifyServicePaymentRequest {
            razorpay_order_id: "order_x".into(),
            razorpay_payment_id: "pay_x".into(),
            razorpay_signature: "deadbeef".into(),
            appointment_id: appointment.id.clone(),
        },
    )
    .await?
    .data
    .expect("verification");
    assert!(!outcome.success);

    let stored = appointment_service::get_appointment(&app.state, &user, &appointment.id)
        .await?
        .data
        .expect("appointment");
    assert_eq!(stored.status, ScheduleStatus::Pending);
    assert_eq!(stored.payment_status, Some(PaymentStatus::Failed));
    Ok(())
}

#[tokio::test]
async fn refunds_and_lookups_are_admin_only() -> anyhow::Result<()> {
    let app = TestApp::new(ConsistencyMode::BestEffort);
    let user = app.user("u1", "", "").await;
    let admin = app.admin();

    let request = || RefundRequest {
        payment_id: "pay_1".into(),
        amount: Some(10.5),
        notes: None,
    };
    let err = payment_service::refund(&app.state, &user, request())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let refund = payment_service::refund(&app.state, &admin, request())
        .await?
        .data
        .expect("refund");
    assert_eq!(refund["amount"], 1050);

    let err = payment_service::payment_details(&app.state, &user, "pay_1")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
    let details = payment_service::payment_details(&app.state, &admin, "pay_1")
        .await?
        .data
        .expect("payment");
    assert_eq!(details["status"], "captured");
    Ok(())
}
