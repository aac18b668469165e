//! End-to-end checkout: cart, billing, payment handoff and order creation.

use std::time::Duration;

use axum::http::StatusCode;
use ironic_gym_integration_tests::{
    PAYMENT_URL, TEE_PRICE_CENTS, TestApp, billing_fields, mount_checkout_session,
    mount_shopper_backend, shopper,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, header_exists, method, path};
use wiremock::{Mock, ResponseTemplate};

async fn signed_in_with_tee(app: &mut TestApp) {
    let signed_in = app.sign_in(&shopper()).await;
    assert_eq!(signed_in.status, StatusCode::SEE_OTHER);
    assert_eq!(signed_in.location(), Some("/"));

    let added = app.post_form("/cart/add", &[("product_id", "p1")]).await;
    assert_eq!(added.status, StatusCode::OK);
    assert_eq!(added.header("hx-trigger"), Some("cart-updated, open-cart"));
}

#[tokio::test]
async fn test_checkout_hands_off_and_creates_order_once() {
    let mut app = TestApp::start().await;
    mount_shopper_backend(&app.backend, &shopper()).await;
    Mock::given(method("POST"))
        .and(path("/api/create-checkout-session"))
        .and(header("authorization", "Bearer jwt-1"))
        .and(body_partial_json(json!({
            "products": [{ "id": "p1", "price": TEE_PRICE_CENTS, "quantity": 1 }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "url": PAYMENT_URL })))
        .expect(1)
        .mount(&app.backend)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/orders"))
        .and(header_exists("Idempotency-Key"))
        .and(body_partial_json(json!({
            "orderItems": [{ "product": "p1", "quantity": 1, "price": TEE_PRICE_CENTS }],
            "shippingAddress": { "city": "Toronto" },
            "totalPrice": TEE_PRICE_CENTS
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "_id": "order-42" })))
        .expect(1)
        .mount(&app.backend)
        .await;

    signed_in_with_tee(&mut app).await;

    let billing = app.post_form("/checkout", &[]).await;
    assert_eq!(billing.status, StatusCode::OK);
    assert!(billing.body.contains("Billing Address"));

    let handoff = app.post_form("/checkout/confirm", &billing_fields()).await;
    assert_eq!(handoff.status, StatusCode::SEE_OTHER);
    assert_eq!(handoff.location(), Some(PAYMENT_URL));

    let count = app.get("/cart/count").await;
    assert!(!count.body.contains("badge"), "cart should be empty after handoff");

    let success = app.get("/payment/success").await;
    assert_eq!(success.status, StatusCode::OK);
    assert!(success.body.contains("order-42"));

    // Reload: the record is gone, so no second order.
    let reload = app.get("/payment/success").await;
    assert!(reload.body.contains("No pending order was found"));
}

#[tokio::test]
async fn test_signed_out_return_keeps_record_until_sign_in() {
    let mut app = TestApp::start().await;
    mount_shopper_backend(&app.backend, &shopper()).await;
    mount_checkout_session(&app.backend).await;
    Mock::given(method("POST"))
        .and(path("/api/orders"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "_id": "order-7" })))
        .expect(1)
        .mount(&app.backend)
        .await;

    signed_in_with_tee(&mut app).await;
    app.post_form("/checkout", &[]).await;
    let handoff = app.post_form("/checkout/confirm", &billing_fields()).await;
    assert_eq!(handoff.status, StatusCode::SEE_OTHER);

    app.post_form("/auth/logout", &[]).await;
    let blocked = app.get("/payment/success").await;
    assert!(blocked.body.contains("You must be logged in to finalize an order."));
    assert!(blocked.body.contains("/auth/signin"));

    app.sign_in(&shopper()).await;
    let success = app.get("/payment/success").await;
    assert!(success.body.contains("order-7"));
}

#[tokio::test]
async fn test_failed_payment_session_keeps_cart() {
    let mut app = TestApp::start().await;
    mount_shopper_backend(&app.backend, &shopper()).await;
    Mock::given(method("POST"))
        .and(path("/api/create-checkout-session"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "message": "Stripe is down" })),
        )
        .mount(&app.backend)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/orders"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&app.backend)
        .await;

    signed_in_with_tee(&mut app).await;
    let failed = app.post_form("/checkout/confirm", &billing_fields()).await;

    assert_eq!(failed.status, StatusCode::OK);
    assert!(failed.body.contains("Stripe is down"));
    assert!(failed.body.contains("Ironic Tee"), "cart page still lists the line");

    let count = app.get("/cart/count").await;
    assert!(count.body.contains(">1<"));
}

#[tokio::test]
async fn test_invalid_address_keeps_billing_form_open() {
    let mut app = TestApp::start().await;
    mount_shopper_backend(&app.backend, &shopper()).await;
    mount_checkout_session(&app.backend).await;

    signed_in_with_tee(&mut app).await;
    let mut fields = billing_fields();
    if let Some(city) = fields.iter_mut().find(|(name, _)| *name == "city") {
        city.1 = "  ";
    }
    let response = app.post_form("/checkout/confirm", &fields).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Billing Address"));
    assert!(response.body.contains("City is required"));
    assert!(response.body.contains("1 King St W"), "submitted values are kept");
}

#[tokio::test]
async fn test_checkout_preconditions() {
    let mut app = TestApp::start().await;
    let mut user = shopper();
    user["city"] = json!("");
    mount_shopper_backend(&app.backend, &user).await;

    let signed_out = app.post_form("/checkout", &[]).await;
    assert!(
        signed_out
            .body
            .contains("You must be signed in to check out. Please sign in first.")
    );

    app.sign_in(&user).await;
    let empty = app.post_form("/checkout", &[]).await;
    assert!(empty.body.contains("Your cart is empty."));

    app.post_form("/cart/add", &[("product_id", "p1")]).await;
    let incomplete = app.post_form("/checkout", &[]).await;
    assert!(incomplete.body.contains(
        "Please complete your full address in your Profile before checking out."
    ));
}

#[tokio::test]
async fn test_cancel_restores_cart() {
    let mut app = TestApp::start().await;
    mount_shopper_backend(&app.backend, &shopper()).await;
    mount_checkout_session(&app.backend).await;
    Mock::given(method("POST"))
        .and(path("/api/orders"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&app.backend)
        .await;

    signed_in_with_tee(&mut app).await;
    app.post_form("/checkout/confirm", &billing_fields()).await;

    let cancel = app.get("/payment/cancel").await;
    assert!(cancel.body.contains("Your items are back in your cart."));

    let count = app.get("/cart/count").await;
    assert!(count.body.contains(">1<"));

    let success = app.get("/payment/success").await;
    assert!(success.body.contains("No pending order was found"));
}

#[tokio::test]
async fn test_reload_during_order_creation_does_not_duplicate() {
    let mut app = TestApp::start().await;
    mount_shopper_backend(&app.backend, &shopper()).await;
    mount_checkout_session(&app.backend).await;
    Mock::given(method("POST"))
        .and(path("/api/orders"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({ "_id": "order-9" }))
                .set_delay(Duration::from_millis(500)),
        )
        .expect(1)
        .mount(&app.backend)
        .await;

    signed_in_with_tee(&mut app).await;
    let handoff = app.post_form("/checkout/confirm", &billing_fields()).await;
    assert_eq!(handoff.status, StatusCode::SEE_OTHER);

    let (first, second) = app.get_twice_concurrently("/payment/success").await;

    let created = [&first, &second]
        .iter()
        .filter(|page| page.body.contains("order-9"))
        .count();
    assert_eq!(created, 1, "exactly one load creates the order");

    let orders_sent = app
        .backend
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == "/api/orders")
        .count();
    assert_eq!(orders_sent, 1);
}
