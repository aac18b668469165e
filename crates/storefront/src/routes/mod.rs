//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page (best sellers + category rows)
//! GET  /health                 - Health check
//!
//! # Catalog
//! GET  /products               - Product listing (?category=)
//! GET  /products/{id}          - Product detail
//! GET  /search                 - Search results (?q=)
//!
//! # Cart (HTMX fragments)
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add one unit (count badge, triggers cart-updated + open-cart)
//! POST /cart/update            - Set quantity, <= 0 removes (cart_items fragment)
//! POST /cart/remove            - Remove line (cart_items fragment)
//! GET  /cart/count             - Cart count badge (fragment)
//!
//! # Checkout
//! POST /checkout               - Check preconditions, show billing form
//! GET  /checkout/address       - Billing fields prefilled from profile (fragment)
//! POST /checkout/confirm       - Hand off to the payment processor
//! GET  /payment/success        - Create the order after payment
//! GET  /payment/cancel         - Payment abandoned, cart restored
//!
//! # Auth
//! GET  /auth/signin            - Sign-in page
//! POST /auth/signin            - Sign-in action
//! GET  /auth/signup            - Sign-up page
//! POST /auth/signup            - Send OTP, then verify it
//! GET  /auth/forgot            - Forgot password page
//! POST /auth/forgot            - Send reset OTP
//! GET  /auth/reset             - Reset password page
//! POST /auth/reset             - Reset password action
//! POST /auth/google            - Google sign-in
//! POST /auth/logout            - Sign out
//!
//! # Account (requires auth)
//! GET  /account/profile        - Profile form
//! POST /account/profile        - Update profile
//! GET  /account/orders         - Order history (?status=)
//!
//! # Admin (requires admin)
//! GET  /admin                        - Dashboard
//! POST /admin/products               - Add product
//! POST /admin/products/{id}          - Update product
//! POST /admin/products/{id}/delete   - Delete product
//! POST /admin/orders/{id}/status     - Status / delivery date
//! ```

pub mod account;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod home;
pub mod payment;
pub mod products;
pub mod search;

use axum::{
    Router,
    routing::{get, post},
};
use ironic_gym_core::{Cart, Product};
use tower_sessions::Session;

use crate::models::CurrentUser;
use crate::state::AppState;
use crate::storage::{DurableStore, keys};

// =============================================================================
// Shared views
// =============================================================================

/// Header/navigation data every full page renders.
#[derive(Clone, Default)]
pub struct NavView {
    pub signed_in: bool,
    pub is_admin: bool,
    pub user_name: String,
    pub cart_count: u64,
}

impl NavView {
    /// Build the header for the visitor behind `session`.
    pub async fn for_session(session: &Session) -> Self {
        let user = CurrentUser::load(session).await.ok().flatten();
        let cart_count = DurableStore::get::<Cart>(session, keys::CART)
            .await
            .ok()
            .flatten()
            .map_or(0, |cart| cart.total_items());

        Self {
            signed_in: user.is_some(),
            is_admin: user.as_ref().is_some_and(CurrentUser::is_admin),
            user_name: user
                .as_ref()
                .map(|u| u.display_name().to_string())
                .unwrap_or_default(),
            cart_count,
        }
    }
}

/// Product tile used on the home, listing and search pages.
#[derive(Clone)]
pub struct ProductCardView {
    pub id: String,
    pub name: String,
    pub brand: String,
    pub price: String,
    pub image_url: String,
    pub in_stock: bool,
}

impl From<&Product> for ProductCardView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            brand: product.brand.clone(),
            price: product.price_cents.to_string(),
            image_url: product.main_image_url.clone(),
            in_stock: product.in_stock(),
        }
    }
}

/// Convert a slice of products into cards.
#[must_use]
pub fn cards(products: &[Product]) -> Vec<ProductCardView> {
    products.iter().map(ProductCardView::from).collect()
}

// =============================================================================
// Routers
// =============================================================================

/// Create the catalog routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/count", get(cart::count))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(checkout::begin))
        .route("/address", get(checkout::profile_address))
        .route("/confirm", post(checkout::confirm))
}

/// Create the payment return routes router.
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/success", get(payment::success))
        .route("/cancel", get(payment::cancel))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signin", get(auth::signin_page).post(auth::signin))
        .route("/signup", get(auth::signup_page).post(auth::signup))
        .route("/forgot", get(auth::forgot_page).post(auth::forgot))
        .route("/reset", get(auth::reset_page).post(auth::reset))
        .route("/google", post(auth::google))
        .route("/logout", post(auth::logout))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/profile",
            get(account::profile).post(account::update_profile),
        )
        .route("/orders", get(account::orders))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin::dashboard))
        .route("/products", post(admin::add_product))
        .route("/products/{id}", post(admin::update_product))
        .route("/products/{id}/delete", post(admin::delete_product))
        .route("/orders/{id}/status", post(admin::update_order_status))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/search", get(search::search))
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .nest("/payment", payment_routes())
        .nest("/auth", auth_routes())
        .nest("/account", account_routes())
        .nest("/admin", admin_routes())
}
