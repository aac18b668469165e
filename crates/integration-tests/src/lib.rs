//! Integration test harness for the Ironic Gym storefront.
//!
//! Tests drive the real router in-process against a `wiremock` stand-in for
//! the store backend. [`TestApp`] carries the session cookie from response
//! to request like a browser would, so multi-step flows (sign in, add to
//! cart, check out, return from payment) share one visitor session.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p ironic-gym-integration-tests
//! ```

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode, header};
use ironic_gym_storefront::config::{BackendConfig, StorefrontConfig};
use ironic_gym_storefront::middleware::session::SESSION_COOKIE_NAME;
use ironic_gym_storefront::state::AppState;
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Price of the test product, in cents.
pub const TEE_PRICE_CENTS: i64 = 999;

/// Where the mocked backend sends shoppers to pay.
pub const PAYMENT_URL: &str = "https://pay.example.com/session/cs_test_1";

/// A response with its body read into a string.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    /// Redirect target, if any.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.header(header::LOCATION.as_str())
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// The storefront router plus one visitor's cookie jar.
pub struct TestApp {
    router: Router,
    cookie: Option<String>,
    /// Stand-in for the store backend.
    pub backend: MockServer,
}

impl TestApp {
    /// Start a mock backend and build the storefront against it.
    ///
    /// # Panics
    ///
    /// Panics if the app cannot be built.
    pub async fn start() -> Self {
        let backend = MockServer::start().await;
        let config = StorefrontConfig {
            host: [127, 0, 0, 1].into(),
            port: 0,
            base_url: "http://localhost:3000".to_string(),
            backend: BackendConfig::new(&backend.uri()).expect("mock server uri"),
            google_client_id: None,
            sentry_dsn: None,
            sentry_environment: None,
        };
        let state = AppState::new(config).expect("app state");

        Self {
            router: ironic_gym_storefront::app(state),
            cookie: None,
            backend,
        }
    }

    /// Send a GET request.
    pub async fn get(&mut self, uri: &str) -> TestResponse {
        let request = Request::get(uri).body(Body::empty()).expect("request");
        self.send(request).await
    }

    /// Send a form-encoded POST request.
    pub async fn post_form(&mut self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .expect("request");
        self.send(request).await
    }

    /// Send two GET requests for `uri` at once with the current cookie, as a
    /// reload while the first load is still running would.
    pub async fn get_twice_concurrently(&mut self, uri: &str) -> (TestResponse, TestResponse) {
        let first = self.prepare(Request::get(uri).body(Body::empty()).expect("request"));
        let second = self.prepare(Request::get(uri).body(Body::empty()).expect("request"));

        let (first, second) = tokio::join!(
            dispatch(self.router.clone(), first),
            dispatch(self.router.clone(), second)
        );
        self.remember_cookie(&first.headers);
        self.remember_cookie(&second.headers);
        (first, second)
    }

    /// Forget the session cookie, as if the browser were closed.
    pub fn clear_cookies(&mut self) {
        self.cookie = None;
    }

    async fn send(&mut self, request: Request<Body>) -> TestResponse {
        let request = self.prepare(request);
        let response = dispatch(self.router.clone(), request).await;
        self.remember_cookie(&response.headers);
        response
    }

    fn prepare(&self, mut request: Request<Body>) -> Request<Body> {
        if let Some(cookie) = &self.cookie {
            request
                .headers_mut()
                .insert(header::COOKIE, cookie.parse().expect("cookie header"));
        }
        request
    }

    fn remember_cookie(&mut self, headers: &HeaderMap) {
        for value in headers.get_all(header::SET_COOKIE) {
            let Ok(value) = value.to_str() else { continue };
            let pair = value.split(';').next().unwrap_or_default().trim();
            if pair.starts_with(&format!("{SESSION_COOKIE_NAME}=")) {
                self.cookie = Some(pair.to_string());
            }
        }
    }

    /// Sign in as `user` against a mocked `POST /api/auth/signin`.
    pub async fn sign_in(&mut self, user: &Value) -> TestResponse {
        let email = user["email"].as_str().unwrap_or_default().to_string();
        self.post_form("/auth/signin", &[("email", &email), ("password", "pw")])
            .await
    }
}

async fn dispatch(router: Router, request: Request<Body>) -> TestResponse {
    let response = router.oneshot(request).await.expect("router is infallible");

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body");

    TestResponse {
        status,
        headers,
        body: String::from_utf8_lossy(&bytes).into_owned(),
    }
}

/// A shopper whose profile has a complete address.
#[must_use]
pub fn shopper() -> Value {
    json!({
        "_id": "u1",
        "name": "Sam Lifter",
        "email": "sam@example.com",
        "phone": "4165550100",
        "addressLine1": "1 King St W",
        "addressLine2": "",
        "city": "Toronto",
        "postalCode": "M5H 1A1",
        "country": "Canada",
        "isAdmin": false
    })
}

/// The one product in the mocked catalog.
#[must_use]
pub fn tee() -> Value {
    json!({
        "_id": "p1",
        "name": "Ironic Tee",
        "price": TEE_PRICE_CENTS,
        "brand": "Ironic Gym",
        "category": "Tee",
        "mainImageUrl": "https://cdn.example.com/tee.jpg",
        "quantity": 5,
        "isBestSeller": true
    })
}

/// Billing form fields for a valid address.
#[must_use]
pub fn billing_fields() -> Vec<(&'static str, &'static str)> {
    vec![
        ("name", "Sam Lifter"),
        ("email", "sam@example.com"),
        ("phone", "4165550100"),
        ("addressLine1", "1 King St W"),
        ("addressLine2", ""),
        ("city", "Toronto"),
        ("postalCode", "M5H 1A1"),
        ("country", "Canada"),
    ]
}

/// Mount the catalog, sign-in and profile endpoints for `user`.
pub async fn mount_shopper_backend(server: &MockServer, user: &Value) {
    Mock::given(method("GET"))
        .and(path("/api/products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([tee()])))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/signin"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "user": user, "token": "jwt-1" })),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user.clone()))
        .mount(server)
        .await;
}

/// Mount a working `POST /api/create-checkout-session`.
pub async fn mount_checkout_session(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/create-checkout-session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "url": PAYMENT_URL })))
        .mount(server)
        .await;
}
