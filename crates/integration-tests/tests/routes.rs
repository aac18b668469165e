//! Page-level routing: health, catalog rendering and access control.

use axum::http::StatusCode;
use ironic_gym_integration_tests::{TestApp, mount_shopper_backend, shopper};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_health() {
    let mut app = TestApp::start().await;

    let response = app.get("/health").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "ok");
    assert!(response.header("x-request-id").is_some());
}

#[tokio::test]
async fn test_home_lists_best_sellers() {
    let mut app = TestApp::start().await;
    mount_shopper_backend(&app.backend, &shopper()).await;

    let response = app.get("/").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Best Sellers"));
    assert!(response.body.contains("Ironic Tee"));
    assert!(response.body.contains("/products/p1"));
}

#[tokio::test]
async fn test_product_detail_and_missing_product() {
    let mut app = TestApp::start().await;
    mount_shopper_backend(&app.backend, &shopper()).await;

    let found = app.get("/products/p1").await;
    assert_eq!(found.status, StatusCode::OK);
    assert!(found.body.contains("Ironic Tee"));

    let missing = app.get("/products/nope").await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_requires_admin_user() {
    let mut app = TestApp::start().await;
    mount_shopper_backend(&app.backend, &shopper()).await;

    let signed_out = app.get("/admin").await;
    assert_eq!(signed_out.status, StatusCode::SEE_OTHER);
    assert_eq!(signed_out.location(), Some("/auth/signin"));

    app.sign_in(&shopper()).await;
    let shopper_view = app.get("/admin").await;
    assert_eq!(shopper_view.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_signs_in_to_dashboard() {
    let mut app = TestApp::start().await;
    let mut admin = shopper();
    admin["isAdmin"] = json!(true);
    mount_shopper_backend(&app.backend, &admin).await;
    Mock::given(method("GET"))
        .and(path("/api/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&app.backend)
        .await;

    let signed_in = app.sign_in(&admin).await;
    assert_eq!(signed_in.location(), Some("/admin"));

    let dashboard = app.get("/admin").await;
    assert_eq!(dashboard.status, StatusCode::OK);
    assert!(dashboard.body.contains("Ironic Tee"));
}

#[tokio::test]
async fn test_account_pages_require_sign_in() {
    let mut app = TestApp::start().await;

    for uri in ["/account/profile", "/account/orders"] {
        let response = app.get(uri).await;
        assert_eq!(response.status, StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(response.location(), Some("/auth/signin"), "{uri}");
    }
}

#[tokio::test]
async fn test_closing_browser_forgets_cart() {
    let mut app = TestApp::start().await;
    mount_shopper_backend(&app.backend, &shopper()).await;

    app.post_form("/cart/add", &[("product_id", "p1")]).await;
    assert!(app.get("/cart/count").await.body.contains(">1<"));

    app.clear_cookies();
    assert!(!app.get("/cart/count").await.body.contains("badge"));
}
