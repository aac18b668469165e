//! Cart route handlers.
//!
//! The cart lives in the visitor's session (see [`CartStore`]). Mutations
//! return HTMX fragments plus an `HX-Trigger` header built from the store's
//! events, so the header badge and cart drawer refresh themselves.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{AppendHeaders, IntoResponse},
};
use ironic_gym_core::{Cart, CartLine, CartProduct, ProductId};
use serde::Deserialize;
use tokio::sync::broadcast;
use tower_sessions::Session;
use tracing::instrument;

use super::NavView;
use crate::cart::{CartEvent, CartStore, drain_triggers};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::state::AppState;

/// Cart item display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub id: String,
    pub name: String,
    pub brand: String,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
    pub image_url: String,
}

impl From<&CartLine> for CartItemView {
    fn from(line: &CartLine) -> Self {
        Self {
            id: line.id.to_string(),
            name: line.name.clone(),
            brand: line.brand.clone(),
            quantity: line.quantity,
            price: line.price_cents.to_string(),
            line_price: line.line_total().to_string(),
            image_url: line.image_url.clone(),
        }
    }
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub item_count: u64,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart.lines().iter().map(CartItemView::from).collect(),
            subtotal: cart.subtotal().to_string(),
            item_count: cart.total_items(),
        }
    }
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
}

/// Update cart form data. Zero or negative removes the line.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: String,
    pub quantity: i64,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: String,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub nav: NavView,
    pub cart: CartView,
    pub error: Option<String>,
}

impl CartShowTemplate {
    /// Render the cart page for `session`, optionally with an error banner.
    pub async fn for_session(session: &Session, error: Option<String>) -> Self {
        let store = CartStore::load(session.clone()).await;
        Self {
            nav: NavView::for_session(session).await,
            cart: CartView::from(store.cart()),
            error,
        }
    }
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u64,
}

/// `HX-Trigger` header for whatever the store emitted.
fn triggers(
    events: &mut broadcast::Receiver<CartEvent>,
) -> Option<AppendHeaders<[(&'static str, String); 1]>> {
    drain_triggers(events).map(|names| AppendHeaders([("HX-Trigger", names)]))
}

/// Display cart page.
#[instrument(skip(session))]
pub async fn show(session: Session) -> impl IntoResponse {
    CartShowTemplate::for_session(&session, None).await
}

/// Add one unit of a product (HTMX).
///
/// Returns the count badge and triggers `cart-updated` and `open-cart`.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddToCartForm>,
) -> Result<impl IntoResponse> {
    let id = ProductId::new(form.product_id);
    let product = state
        .backend()
        .find_product(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    let mut store = CartStore::load(session).await;
    let mut events = store.subscribe();
    let quantity = store.add_item(CartProduct::from(&product)).await?;

    add_breadcrumb("cart", "Added to cart", &[("product_id", id.as_str())]);
    tracing::debug!(product_id = %id, quantity, "Added to cart");

    Ok((
        triggers(&mut events),
        CartCountTemplate {
            count: store.total_items(),
        },
    ))
}

/// Set a line's quantity (HTMX).
#[instrument(skip(session))]
pub async fn update(
    session: Session,
    Form(form): Form<UpdateCartForm>,
) -> Result<impl IntoResponse> {
    let mut store = CartStore::load(session).await;
    let mut events = store.subscribe();
    store
        .update_quantity(&ProductId::new(form.product_id), form.quantity)
        .await?;

    Ok((
        triggers(&mut events),
        CartItemsTemplate {
            cart: CartView::from(store.cart()),
        },
    ))
}

/// Remove a line (HTMX).
#[instrument(skip(session))]
pub async fn remove(
    session: Session,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<impl IntoResponse> {
    let mut store = CartStore::load(session).await;
    let mut events = store.subscribe();
    store.remove_item(&ProductId::new(form.product_id)).await?;

    Ok((
        triggers(&mut events),
        CartItemsTemplate {
            cart: CartView::from(store.cart()),
        },
    ))
}

/// Get cart count badge (HTMX).
#[instrument(skip(session))]
pub async fn count(session: Session) -> impl IntoResponse {
    let store = CartStore::load(session).await;
    CartCountTemplate {
        count: store.total_items(),
    }
}
