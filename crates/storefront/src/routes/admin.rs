//! Admin console route handlers.
//!
//! One dashboard lists every product and every order. Each form posts to
//! its own route, which redirects back to the dashboard with a `success`
//! or `error` code.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect},
};
use chrono::NaiveDate;
use ironic_gym_core::{
    Cents, Order, OrderId, OrderStatus, Product, ProductCategory, ProductDraft, ProductId,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::NavView;
use crate::backend::StatusUpdate;
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// Category dropdown for new products, default first.
const CATEGORY_OPTIONS: [&str; 4] = ["Tee", "Hoodie", "Shorts", "Accessory"];

/// Format of the `<input type="date">` value.
const DATE_INPUT_FORMAT: &str = "%Y-%m-%d";

// =============================================================================
// Views
// =============================================================================

/// Product row in the admin list.
#[derive(Clone)]
pub struct AdminProductView {
    pub id: String,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub price: String,
    pub quantity: u32,
    pub is_best_seller: bool,
    pub image_url: String,
}

impl From<&Product> for AdminProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            brand: product.brand.clone(),
            category: product.category.to_string(),
            price: product.price_cents.to_string(),
            quantity: product.quantity,
            is_best_seller: product.is_best_seller,
            image_url: product.thumbnail_url().to_string(),
        }
    }
}

/// Option in the status dropdown.
#[derive(Clone)]
pub struct StatusOptionView {
    pub value: &'static str,
    pub selected: bool,
}

/// Order card in the admin list.
#[derive(Clone)]
pub struct AdminOrderView {
    pub id: String,
    pub placed_on: String,
    pub customer: String,
    pub ship_name: String,
    pub ship_email: String,
    pub ship_phone: String,
    pub items: Vec<String>,
    pub total: String,
    pub delivered_on: Option<String>,
    pub status_options: Vec<StatusOptionView>,
    /// Whether a delivery date can be recorded for the current status.
    pub can_set_date: bool,
    /// Current delivery date as an `<input type="date">` value.
    pub date_input: String,
}

impl From<&Order> for AdminOrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.to_string(),
            placed_on: order
                .created_at
                .map_or_else(|| "N/A".to_string(), |at| {
                    at.format("%B %-d, %Y").to_string()
                }),
            customer: order
                .user
                .as_ref()
                .map(|user| user.label().to_string())
                .unwrap_or_default(),
            ship_name: order.shipping_address.name.clone(),
            ship_email: order.shipping_address.email.clone(),
            ship_phone: order.shipping_address.phone.clone(),
            items: order
                .order_items
                .iter()
                .map(|line| format!("{} x {}", line.quantity, line.name))
                .collect(),
            total: order.total_price_cents.to_string(),
            delivered_on: order
                .delivered_at
                .map(|at| at.format("%B %-d, %Y").to_string()),
            status_options: OrderStatus::ALL
                .into_iter()
                .map(|status| StatusOptionView {
                    value: status.as_str(),
                    selected: status == order.status,
                })
                .collect(),
            can_set_date: order.status.accepts_delivery_date(),
            date_input: order
                .delivered_at
                .map(|at| at.format(DATE_INPUT_FORMAT).to_string())
                .unwrap_or_default(),
        }
    }
}

/// Admin dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/dashboard.html")]
pub struct DashboardTemplate {
    pub nav: NavView,
    pub categories: Vec<&'static str>,
    pub products: Vec<AdminProductView>,
    pub orders: Vec<AdminOrderView>,
    pub success: Option<&'static str>,
    pub error: Option<String>,
}

// =============================================================================
// Forms
// =============================================================================

/// Query parameters carrying the outcome of the last action.
#[derive(Debug, Default, Deserialize)]
pub struct NoticeQuery {
    pub success: Option<String>,
    pub error: Option<String>,
}

/// New product form. The price is typed in dollars.
#[derive(Debug, Deserialize)]
pub struct ProductForm {
    pub name: String,
    pub price: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub category: String,
    /// Checkbox: present when ticked.
    #[serde(default)]
    pub is_best_seller: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub main_image_url: String,
    #[serde(default)]
    pub cart_image_url: String,
}

impl ProductForm {
    /// Build the backend payload, or the error code to redirect with.
    fn into_draft(self) -> Result<ProductDraft, &'static str> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err("missing_name");
        }
        let price_cents = Cents::parse_dollars(&self.price).ok_or("invalid_price")?;
        let category = match self.category.trim() {
            "" => ProductCategory::default(),
            other => ProductCategory::from(other.to_string()),
        };

        Ok(ProductDraft {
            name,
            price_cents,
            brand: self.brand.trim().to_string(),
            quantity: self.quantity,
            category,
            is_best_seller: self.is_best_seller.is_some(),
            description: self.description,
            main_image_url: self.main_image_url.trim().to_string(),
            cart_image_url: self.cart_image_url.trim().to_string(),
        })
    }
}

/// Stock update form.
#[derive(Debug, Deserialize)]
pub struct StockForm {
    pub quantity: u32,
}

/// Order status / delivery date form. Blank fields are left unchanged.
#[derive(Debug, Deserialize)]
pub struct OrderStatusForm {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub delivered_at: Option<String>,
}

impl OrderStatusForm {
    fn into_update(self) -> Result<StatusUpdate, &'static str> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<OrderStatus>().map_err(|_| "invalid_status")?),
        };
        let delivered_at = match self.delivered_at.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                NaiveDate::parse_from_str(raw, DATE_INPUT_FORMAT).map_err(|_| "invalid_date")?,
            ),
        };

        let update = StatusUpdate {
            status,
            delivered_at,
        };
        if update.is_empty() {
            return Err("nothing_to_update");
        }
        Ok(update)
    }
}

// =============================================================================
// Messages
// =============================================================================

fn success_message(code: &str) -> Option<&'static str> {
    match code {
        "product_added" => Some("Product added successfully!"),
        "stock_updated" => Some("Stock updated."),
        "product_deleted" => Some("Product deleted."),
        "order_updated" => Some("Order updated."),
        _ => None,
    }
}

fn error_message(code: &str) -> String {
    match code {
        "missing_name" => "Product name is required.",
        "invalid_price" => "Enter the price in dollars, e.g. 24.99.",
        "invalid_status" => "Unknown order status.",
        "invalid_date" => "Enter a valid delivery date.",
        "nothing_to_update" => "Choose a status or a delivery date.",
        "not_found" => "That item no longer exists.",
        _ => "The request failed. Please try again.",
    }
    .to_string()
}

fn back_to_dashboard(outcome: Result<&str, &str>) -> Redirect {
    match outcome {
        Ok(code) => Redirect::to(&format!("/admin?success={code}")),
        Err(code) => Redirect::to(&format!("/admin?error={code}")),
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Admin dashboard: products and orders.
#[instrument(skip(state, session, admin))]
pub async fn dashboard(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Query(query): Query<NoticeQuery>,
) -> impl IntoResponse {
    let backend = state.backend();
    let (products, orders) =
        tokio::join!(backend.list_products(), backend.all_orders(&admin.token));

    let mut error = query.error.as_deref().map(error_message);

    let products: Vec<AdminProductView> = products
        .map(|products| products.iter().map(AdminProductView::from).collect())
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Admin dashboard could not load products");
            error.get_or_insert_with(|| e.user_message());
            Vec::new()
        });
    let orders: Vec<AdminOrderView> = orders
        .map(|orders| orders.iter().map(AdminOrderView::from).collect())
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Admin dashboard could not load orders");
            error.get_or_insert_with(|| e.user_message());
            Vec::new()
        });

    DashboardTemplate {
        nav: NavView::for_session(&session).await,
        categories: CATEGORY_OPTIONS.to_vec(),
        products,
        orders,
        success: query.success.as_deref().and_then(success_message),
        error,
    }
}

/// Create a product.
#[instrument(skip(state, admin))]
pub async fn add_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Form(form): Form<ProductForm>,
) -> impl IntoResponse {
    let draft = match form.into_draft() {
        Ok(draft) => draft,
        Err(code) => return back_to_dashboard(Err(code)),
    };

    match state.backend().add_product(&admin.token, &draft).await {
        Ok(()) => {
            tracing::info!(name = %draft.name, "Product added");
            back_to_dashboard(Ok("product_added"))
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to add product");
            back_to_dashboard(Err("backend"))
        }
    }
}

/// Set a product's stock level.
#[instrument(skip(state, admin))]
pub async fn update_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    Form(form): Form<StockForm>,
) -> impl IntoResponse {
    let id = ProductId::new(id);
    let product = match state.backend().find_product(&id).await {
        Ok(Some(product)) => product,
        Ok(None) => return back_to_dashboard(Err("not_found")),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load product for update");
            return back_to_dashboard(Err("backend"));
        }
    };

    let draft = ProductDraft {
        quantity: form.quantity,
        ..ProductDraft::from(&product)
    };
    match state.backend().update_product(&admin.token, &id, &draft).await {
        Ok(()) => {
            tracing::info!(product_id = %id, quantity = form.quantity, "Stock updated");
            back_to_dashboard(Ok("stock_updated"))
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to update product");
            back_to_dashboard(Err("backend"))
        }
    }
}

/// Delete a product.
#[instrument(skip(state, admin))]
pub async fn delete_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let id = ProductId::new(id);
    match state.backend().delete_product(&admin.token, &id).await {
        Ok(()) => {
            tracing::info!(product_id = %id, "Product deleted");
            back_to_dashboard(Ok("product_deleted"))
        }
        Err(e) if e.is_not_found() => back_to_dashboard(Err("not_found")),
        Err(e) => {
            tracing::error!(error = %e, "Failed to delete product");
            back_to_dashboard(Err("backend"))
        }
    }
}

/// Change an order's status and/or delivery date.
#[instrument(skip(state, admin))]
pub async fn update_order_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    Form(form): Form<OrderStatusForm>,
) -> impl IntoResponse {
    let update = match form.into_update() {
        Ok(update) => update,
        Err(code) => return back_to_dashboard(Err(code)),
    };

    let id = OrderId::new(id);
    match state
        .backend()
        .update_order_status(&admin.token, &id, &update)
        .await
    {
        Ok(()) => {
            tracing::info!(order_id = %id, ?update, "Order updated");
            back_to_dashboard(Ok("order_updated"))
        }
        Err(e) if e.is_not_found() => back_to_dashboard(Err("not_found")),
        Err(e) => {
            tracing::error!(error = %e, "Failed to update order");
            back_to_dashboard(Err("backend"))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product_form(price: &str) -> ProductForm {
        ProductForm {
            name: "Pump Cover".to_string(),
            price: price.to_string(),
            brand: "Ironic".to_string(),
            quantity: 4,
            category: String::new(),
            is_best_seller: Some("on".to_string()),
            description: String::new(),
            main_image_url: String::new(),
            cart_image_url: String::new(),
        }
    }

    #[test]
    fn test_product_form_converts_dollars() {
        let draft = product_form("24.99").into_draft().unwrap();
        assert_eq!(draft.price_cents, Cents::new(2499));
        assert_eq!(draft.category, ProductCategory::Tee);
        assert!(draft.is_best_seller);
    }

    #[test]
    fn test_product_form_rejects_bad_input() {
        assert_eq!(product_form("abc").into_draft(), Err("invalid_price"));

        let mut form = product_form("10");
        form.name = "  ".to_string();
        assert_eq!(form.into_draft(), Err("missing_name"));
    }

    #[test]
    fn test_status_form() {
        let form = OrderStatusForm {
            status: Some("Dispatched".to_string()),
            delivered_at: Some(String::new()),
        };
        let update = form.into_update().unwrap();
        assert_eq!(update.status, Some(OrderStatus::Dispatched));
        assert!(update.delivered_at.is_none());

        let form = OrderStatusForm {
            status: None,
            delivered_at: Some("2026-03-04".to_string()),
        };
        assert_eq!(
            form.into_update().unwrap().delivered_at,
            NaiveDate::from_ymd_opt(2026, 3, 4)
        );

        let blank = OrderStatusForm {
            status: Some(String::new()),
            delivered_at: None,
        };
        assert_eq!(blank.into_update().unwrap_err(), "nothing_to_update");

        let bad = OrderStatusForm {
            status: None,
            delivered_at: Some("03/04/2026".to_string()),
        };
        assert_eq!(bad.into_update().unwrap_err(), "invalid_date");
    }

    #[test]
    fn test_unknown_codes_fall_back() {
        assert!(success_message("bogus").is_none());
        assert_eq!(
            error_message("bogus"),
            "The request failed. Please try again."
        );
    }
}
