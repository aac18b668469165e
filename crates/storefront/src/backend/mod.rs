//! Client for the external store backend.
//!
//! # Architecture
//!
//! - The backend owns products, users, orders and payments; the storefront
//!   keeps no copy beyond a short-lived product list cache
//! - JSON over HTTP via `reqwest`, bearer auth for signed-in calls
//! - The product list is cached in `moka` and invalidated by admin writes
//!
//! Non-success responses carry a `{ "message" }` or `{ "error" }` body; that
//! text is surfaced to the shopper through [`BackendError::user_message`].

pub mod types;

pub use types::{AuthSession, CheckoutSession, GoogleSignIn, SignupRequest, StatusUpdate};

use std::sync::Arc;
use std::time::Duration;

use ironic_gym_core::{
    AddressForm, Cart, HandoffRecord, Order, OrderId, Product, ProductCategory, ProductDraft,
    ProductId, UserProfile,
};
use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;
use uuid::Uuid;

use crate::config::BackendConfig;
use types::{
    AuthResponse, CheckoutItem, CheckoutSessionRequest, CreateOrderRequest, EmailRequest,
    ErrorBody, ResetPasswordRequest, SignInRequest,
};

/// Header carrying the handoff record's key on order creation.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

const PRODUCTS_CACHE_KEY: &str = "products";

/// How long a submitted idempotency key blocks another submission.
const SUBMITTED_ORDER_TTL: Duration = Duration::from_secs(60 * 60);

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The request never got a response (connect failure, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("Backend returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The response body was not the expected JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The configured base URL cannot have path segments appended.
    #[error("Backend URL cannot be used as a base: {0}")]
    InvalidBaseUrl(String),

    /// An order for this idempotency key was already sent from this process.
    #[error("Order {0} was already submitted")]
    AlreadySubmitted(Uuid),
}

impl BackendError {
    /// Text safe to show a shopper.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            Self::Http(_) => "We couldn't reach the store. Please try again.".to_string(),
            Self::RateLimited(_) => {
                "Too many requests. Please wait a moment and try again.".to_string()
            }
            Self::Parse(_) | Self::InvalidBaseUrl(_) => {
                "Something went wrong. Please try again.".to_string()
            }
            Self::AlreadySubmitted(_) => {
                "This order was already submitted. Check My Orders.".to_string()
            }
        }
    }

    /// Whether the backend rejected the bearer token.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api { status: 401, .. })
    }

    /// Whether the backend has no such resource.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }
}

// =============================================================================
// BackendClient
// =============================================================================

/// Client for the store backend.
///
/// Cheap to clone; clones share the HTTP connection pool and product cache.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base_url: Url,
    products: Cache<&'static str, Arc<Vec<Product>>>,
    /// Idempotency keys of orders already sent, shared by all requests.
    submitted_orders: Cache<Uuid, ()>,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        let products = Cache::builder()
            .max_capacity(1)
            .time_to_live(config.product_cache_ttl)
            .build();

        let submitted_orders = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(SUBMITTED_ORDER_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client,
                base_url: config.api_url.clone(),
                products,
                submitted_orders,
            }),
        })
    }

    /// Build a URL from path segments. Segments are percent-encoded, so ids
    /// cannot escape their position in the path.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| BackendError::InvalidBaseUrl(self.inner.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(
        &self,
        method: Method,
        segments: &[&str],
        token: Option<&SecretString>,
    ) -> Result<RequestBuilder, BackendError> {
        let request = self
            .inner
            .client
            .request(method, self.endpoint(segments)?);
        Ok(match token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        })
    }

    /// Send a request and return the body of a successful response.
    async fn execute(request: RequestBuilder) -> Result<String, BackendError> {
        let response = request.send().await?;
        let status = response.status();

        // Check for rate limiting
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(BackendError::RateLimited(retry_after));
        }

        let body = response.text().await?;

        if !status.is_success() {
            let preview = body.chars().take(500).collect::<String>();
            if status.is_server_error() {
                tracing::error!(status = %status, body = %preview, "Backend returned server error");
            } else {
                debug!(status = %status, body = %preview, "Backend rejected request");
            }

            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(ErrorBody::into_message)
                .unwrap_or_else(|| format!("Request failed ({})", status.as_u16()));
            return Err(BackendError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(body)
    }

    /// Send a request and decode its JSON body.
    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, BackendError> {
        let body = Self::execute(request).await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            BackendError::Parse(e)
        })
    }

    /// Send a request whose response body is not needed.
    async fn send_empty(request: RequestBuilder) -> Result<(), BackendError> {
        Self::execute(request).await.map(drop)
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Every product in the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Arc<Vec<Product>>, BackendError> {
        if let Some(products) = self.inner.products.get(&PRODUCTS_CACHE_KEY).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let request = self.request(Method::GET, &["api", "products"], None)?;
        let products: Arc<Vec<Product>> = Arc::new(Self::send(request).await?);

        self.inner
            .products
            .insert(PRODUCTS_CACHE_KEY, Arc::clone(&products))
            .await;

        Ok(products)
    }

    /// Look a product up by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn find_product(&self, id: &ProductId) -> Result<Option<Product>, BackendError> {
        let products = self.list_products().await?;
        Ok(products.iter().find(|p| &p.id == id).cloned())
    }

    /// Products whose name, brand or category contains `term`.
    ///
    /// A blank term matches nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn search_products(&self, term: &str) -> Result<Vec<Product>, BackendError> {
        let products = self.list_products().await?;
        Ok(products.iter().filter(|p| p.matches(term)).cloned().collect())
    }

    /// Products in one category.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(category = %category))]
    pub async fn products_by_category(
        &self,
        category: &ProductCategory,
    ) -> Result<Vec<Product>, BackendError> {
        let products = self.list_products().await?;
        Ok(products
            .iter()
            .filter(|p| &p.category == category)
            .cloned()
            .collect())
    }

    /// Products flagged as best sellers.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn best_sellers(&self) -> Result<Vec<Product>, BackendError> {
        let products = self.list_products().await?;
        Ok(products.iter().filter(|p| p.is_best_seller).cloned().collect())
    }

    // =========================================================================
    // Admin: products
    // =========================================================================

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token, draft), fields(name = %draft.name))]
    pub async fn add_product(
        &self,
        token: &SecretString,
        draft: &ProductDraft,
    ) -> Result<(), BackendError> {
        let request = self
            .request(Method::POST, &["api", "products", "add"], Some(token))?
            .json(draft);
        Self::send_empty(request).await?;
        self.inner.products.invalidate_all();
        Ok(())
    }

    /// Replace a product's fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token, draft), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        token: &SecretString,
        id: &ProductId,
        draft: &ProductDraft,
    ) -> Result<(), BackendError> {
        let request = self
            .request(Method::PUT, &["api", "products", id.as_str()], Some(token))?
            .json(draft);
        Self::send_empty(request).await?;
        self.inner.products.invalidate_all();
        Ok(())
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(product_id = %id))]
    pub async fn delete_product(
        &self,
        token: &SecretString,
        id: &ProductId,
    ) -> Result<(), BackendError> {
        let request =
            self.request(Method::DELETE, &["api", "products", id.as_str()], Some(token))?;
        Self::send_empty(request).await?;
        self.inner.products.invalidate_all();
        Ok(())
    }

    // =========================================================================
    // Profile
    // =========================================================================

    /// The signed-in user's profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn get_profile(&self, token: &SecretString) -> Result<UserProfile, BackendError> {
        let request = self.request(Method::GET, &["api", "users", "me"], Some(token))?;
        Self::send(request).await
    }

    /// Update the signed-in user's contact and address fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token, profile))]
    pub async fn update_profile(
        &self,
        token: &SecretString,
        profile: &AddressForm,
    ) -> Result<(), BackendError> {
        let request = self
            .request(Method::PUT, &["api", "users", "me"], Some(token))?
            .json(profile);
        Self::send_empty(request).await
    }

    // =========================================================================
    // Checkout & orders
    // =========================================================================

    /// Open a hosted payment session for the cart's lines.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token, cart), fields(lines = cart.lines().len()))]
    pub async fn create_checkout_session(
        &self,
        token: &SecretString,
        cart: &Cart,
    ) -> Result<CheckoutSession, BackendError> {
        let body = CheckoutSessionRequest {
            products: cart.lines().iter().map(CheckoutItem::from).collect(),
        };
        let request = self
            .request(Method::POST, &["api", "create-checkout-session"], Some(token))?
            .json(&body);
        Self::send(request).await
    }

    /// Create the order described by a handoff record.
    ///
    /// The record's key is sent as `Idempotency-Key` so a backend that
    /// honours it can drop duplicates from a second tab. The key is also
    /// claimed locally first: a second call with the same key, from any
    /// request, is refused without touching the network.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::AlreadySubmitted`] if the key was already
    /// claimed, or an error if the API request fails.
    #[instrument(skip(self, token, record), fields(idempotency_key = %record.idempotency_key))]
    pub async fn create_order(
        &self,
        token: &SecretString,
        record: &HandoffRecord,
    ) -> Result<Order, BackendError> {
        let claim = self
            .inner
            .submitted_orders
            .entry(record.idempotency_key)
            .or_insert(())
            .await;
        if !claim.is_fresh() {
            return Err(BackendError::AlreadySubmitted(record.idempotency_key));
        }

        let request = self
            .request(Method::POST, &["api", "orders"], Some(token))?
            .header(IDEMPOTENCY_KEY_HEADER, record.idempotency_key.to_string())
            .json(&CreateOrderRequest::from(record));
        Self::send(request).await
    }

    /// Orders placed by the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn my_orders(&self, token: &SecretString) -> Result<Vec<Order>, BackendError> {
        let request = self.request(Method::GET, &["api", "orders", "myorders"], Some(token))?;
        Self::send(request).await
    }

    /// Every order (admin only).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn all_orders(&self, token: &SecretString) -> Result<Vec<Order>, BackendError> {
        let request = self.request(Method::GET, &["api", "orders"], Some(token))?;
        Self::send(request).await
    }

    /// Change an order's status and/or delivery date (admin only).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(order_id = %id))]
    pub async fn update_order_status(
        &self,
        token: &SecretString,
        id: &OrderId,
        update: &StatusUpdate,
    ) -> Result<(), BackendError> {
        let request = self
            .request(
                Method::PUT,
                &["api", "orders", id.as_str(), "status"],
                Some(token),
            )?
            .json(update);
        Self::send_empty(request).await
    }

    // =========================================================================
    // Auth
    // =========================================================================

    /// Start sign-up: the backend emails a one-time code.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, signup))]
    pub async fn send_otp(&self, signup: &SignupRequest) -> Result<(), BackendError> {
        let request = self
            .request(Method::POST, &["api", "auth", "send-otp"], None)?
            .json(signup);
        Self::send_empty(request).await
    }

    /// Finish sign-up with the emailed code.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the code is rejected.
    #[instrument(skip(self, signup))]
    pub async fn verify_otp(&self, signup: &SignupRequest) -> Result<AuthSession, BackendError> {
        let request = self
            .request(Method::POST, &["api", "auth", "verify-otp"], None)?
            .json(signup);
        Self::send::<AuthResponse>(request).await.map(AuthSession::from)
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the credentials are rejected.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, BackendError> {
        let request = self
            .request(Method::POST, &["api", "auth", "signin"], None)?
            .json(&SignInRequest { email, password });
        Self::send::<AuthResponse>(request).await.map(AuthSession::from)
    }

    /// Email a password reset code.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn send_reset_otp(&self, email: &str) -> Result<(), BackendError> {
        let request = self
            .request(Method::POST, &["api", "auth", "send-reset-otp"], None)?
            .json(&EmailRequest { email });
        Self::send_empty(request).await
    }

    /// Set a new password using the emailed reset code.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the code is rejected.
    #[instrument(skip(self, otp, new_password))]
    pub async fn reset_password(
        &self,
        email: &str,
        otp: &str,
        new_password: &str,
    ) -> Result<(), BackendError> {
        let request = self
            .request(Method::POST, &["api", "auth", "reset-password"], None)?
            .json(&ResetPasswordRequest {
                email,
                otp,
                new_password,
            });
        Self::send_empty(request).await
    }

    /// Sign in (or sign up) with a Google identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, identity), fields(email = %identity.email))]
    pub async fn google_sign_in(&self, identity: &GoogleSignIn) -> Result<AuthSession, BackendError> {
        let request = self
            .request(Method::POST, &["api", "auth", "google-signin"], None)?
            .json(identity);
        Self::send::<AuthResponse>(request).await.map(AuthSession::from)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> BackendClient {
        BackendClient::new(&BackendConfig::new(&server.uri()).unwrap()).unwrap()
    }

    fn products_json() -> serde_json::Value {
        serde_json::json!([
            {"_id": "p1", "name": "Pump Cover", "price": 4500, "brand": "Ironic", "category": "Hoodie", "isBestSeller": true},
            {"_id": "p2", "name": "Split Shorts", "price": 2800, "brand": "Ironic", "category": "Shorts"}
        ])
    }

    #[tokio::test]
    async fn test_product_list_is_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/products"))
            .respond_with(ResponseTemplate::new(200).set_body_json(products_json()))
            .expect(1)
            .mount(&server)
            .await;

        let backend = client(&server);
        assert_eq!(backend.list_products().await.unwrap().len(), 2);
        assert_eq!(backend.best_sellers().await.unwrap().len(), 1);
        assert_eq!(
            backend
                .products_by_category(&ProductCategory::Shorts)
                .await
                .unwrap()[0]
                .id
                .as_str(),
            "p2"
        );
        assert!(
            backend
                .find_product(&ProductId::new("missing"))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_admin_write_invalidates_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/products"))
            .respond_with(ResponseTemplate::new(200).set_body_json(products_json()))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/products/p2"))
            .and(header("Authorization", "Bearer admin-jwt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let backend = client(&server);
        let token = SecretString::from("admin-jwt");
        backend.list_products().await.unwrap();
        backend
            .delete_product(&token, &ProductId::new("p2"))
            .await
            .unwrap();
        backend.list_products().await.unwrap();
    }

    #[tokio::test]
    async fn test_error_message_comes_from_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/signin"))
            .and(body_json(serde_json::json!({"email": "sam@example.com", "password": "bad"})))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({"message": "Invalid credentials"})),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .sign_in("sam@example.com", "bad")
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(err.user_message(), "Invalid credentials");
    }

    #[tokio::test]
    async fn test_error_without_body_gets_status_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/users/me"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client(&server)
            .get_profile(&SecretString::from("jwt"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Api { status: 500, .. }));
        assert_eq!(err.user_message(), "Request failed (500)");
    }

    #[tokio::test]
    async fn test_rate_limit_reads_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/products"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
            .mount(&server)
            .await;

        let err = client(&server).list_products().await.unwrap_err();
        assert!(matches!(err, BackendError::RateLimited(7)));
    }

    #[tokio::test]
    async fn test_ids_are_escaped_into_a_single_segment() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/orders/a%2Fb/status"))
            .and(body_json(serde_json::json!({"status": "Accepted"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let update = StatusUpdate {
            status: Some(ironic_gym_core::OrderStatus::Accepted),
            delivered_at: None,
        };
        client(&server)
            .update_order_status(&SecretString::from("jwt"), &OrderId::new("a/b"), &update)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_order_key_is_submitted_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/orders"))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(serde_json::json!({"_id": "o1"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let backend = client(&server);
        let other_handle = backend.clone();
        let token = SecretString::from("jwt");
        let record = HandoffRecord::from_cart(&Cart::new(), AddressForm::default());

        let (first, second) = tokio::join!(
            backend.create_order(&token, &record),
            other_handle.create_order(&token, &record)
        );

        let created = [&first, &second]
            .iter()
            .filter(|result| result.is_ok())
            .count();
        assert_eq!(created, 1);
        assert!(
            [first, second]
                .into_iter()
                .any(|result| matches!(result, Err(BackendError::AlreadySubmitted(_))))
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path_prefix() {
        let config = BackendConfig::new("https://example.com/backend").unwrap();
        let backend = BackendClient::new(&config).unwrap();
        assert_eq!(
            backend.endpoint(&["api", "users", "me"]).unwrap().as_str(),
            "https://example.com/backend/api/users/me"
        );
    }
}
