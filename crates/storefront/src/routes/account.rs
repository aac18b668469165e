//! Account route handlers.
//!
//! These routes require authentication.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use ironic_gym_core::{AddressForm, Order, OrderStatus, UserProfile};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::NavView;
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::middleware::auth::SIGN_IN_PATH;
use crate::models::CurrentUser;
use crate::state::AppState;
use crate::storage::{DurableStore, keys};

const PROFILE_UPDATED: &str = "Profile updated successfully!";

/// Profile form values.
#[derive(Clone, Default)]
pub struct ProfileView {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address_line1: String,
    pub address_line2: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

impl From<&UserProfile> for ProfileView {
    fn from(profile: &UserProfile) -> Self {
        Self {
            name: profile.name.clone(),
            email: profile.email.clone(),
            phone: profile.phone.clone(),
            address_line1: profile.address_line1.clone(),
            address_line2: profile.address_line2.clone(),
            city: profile.city.clone(),
            postal_code: profile.postal_code.clone(),
            country: profile.country.clone(),
        }
    }
}

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/profile.html")]
pub struct ProfileTemplate {
    pub nav: NavView,
    pub profile: ProfileView,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Order line display data.
#[derive(Clone)]
pub struct OrderItemView {
    pub name: String,
    pub quantity: u32,
    pub line_price: String,
    pub image_url: String,
}

/// Order display data for the history page.
#[derive(Clone)]
pub struct OrderView {
    pub id: String,
    pub placed_on: String,
    pub items: Vec<OrderItemView>,
    pub total: String,
    pub status: String,
    pub delivery: String,
    /// Width of the progress bar, in percent.
    pub progress: &'static str,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.to_string(),
            placed_on: order
                .created_at
                .map(|at| at.format("%B %-d, %Y").to_string())
                .unwrap_or_default(),
            items: order
                .order_items
                .iter()
                .map(|line| OrderItemView {
                    name: line.name.clone(),
                    quantity: line.quantity,
                    line_price: line.line_total().to_string(),
                    image_url: line.image_url.clone(),
                })
                .collect(),
            total: order.total_price_cents.to_string(),
            status: order.status.to_string(),
            delivery: delivery_text(order),
            progress: progress_percent(order.status),
        }
    }
}

/// Status filter tab.
#[derive(Clone)]
pub struct StatusTabView {
    pub label: &'static str,
    pub href: String,
    pub active: bool,
}

/// Order history page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/orders.html")]
pub struct OrdersTemplate {
    pub nav: NavView,
    pub tabs: Vec<StatusTabView>,
    pub orders: Vec<OrderView>,
    pub error: Option<String>,
}

/// Query parameters for the order history.
#[derive(Debug, Default, Deserialize)]
pub struct OrdersQuery {
    pub status: Option<String>,
}

/// Delivery line under an order.
fn delivery_text(order: &Order) -> String {
    match (order.delivered_at, order.status) {
        (Some(at), _) => format!("Delivered on {}", at.format("%B %-d, %Y")),
        (None, OrderStatus::Completed) => "Delivered".to_string(),
        (None, _) => "Est. delivery: 7-10 business days".to_string(),
    }
}

/// Progress bar width for a status.
const fn progress_percent(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Received => "0",
        OrderStatus::Accepted => "33.3",
        OrderStatus::Dispatched => "66.6",
        OrderStatus::Completed => "100",
    }
}

fn status_tabs(active: Option<OrderStatus>) -> Vec<StatusTabView> {
    let all = StatusTabView {
        label: "All",
        href: "/account/orders".to_string(),
        active: active.is_none(),
    };
    std::iter::once(all)
        .chain(OrderStatus::ALL.into_iter().map(|status| StatusTabView {
            label: status.as_str(),
            href: format!("/account/orders?status={status}"),
            active: active == Some(status),
        }))
        .collect()
}

/// Display the profile form.
///
/// A token the backend no longer accepts signs the user out.
#[instrument(skip(state, session, user))]
pub async fn profile(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Response> {
    let profile = match state.backend().get_profile(&user.token).await {
        Ok(profile) => profile,
        Err(e) if e.is_unauthorized() => {
            tracing::info!("Stored token rejected; signing out");
            CurrentUser::clear(&session).await?;
            return Ok(Redirect::to(SIGN_IN_PATH).into_response());
        }
        Err(e) => return Err(e.into()),
    };

    Ok(ProfileTemplate {
        nav: NavView::for_session(&session).await,
        profile: ProfileView::from(&profile),
        error: None,
        success: None,
    }
    .into_response())
}

/// Save the profile form.
///
/// The stored user is refreshed from the backend so the header and the
/// checkout prefill see the new values.
#[instrument(skip(state, session, user, form))]
pub async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<AddressForm>,
) -> Result<impl IntoResponse> {
    let form = form.normalized();

    let result = state.backend().update_profile(&user.token, &form).await;
    let (profile, error, success) = match result {
        Ok(()) => {
            let profile = state.backend().get_profile(&user.token).await?;
            DurableStore::insert(&session, keys::USER, &profile).await?;
            tracing::info!(email = %profile.email, "Profile updated");
            (ProfileView::from(&profile), None, Some(PROFILE_UPDATED.to_string()))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Profile update rejected");
            let mut view = ProfileView::from(&user.profile);
            view.name = form.name;
            view.phone = form.phone;
            view.address_line1 = form.address_line1;
            view.address_line2 = form.address_line2.unwrap_or_default();
            view.city = form.city;
            view.postal_code = form.postal_code;
            view.country = form.country;
            (view, Some(e.user_message()), None)
        }
    };

    Ok(ProfileTemplate {
        nav: NavView::for_session(&session).await,
        profile,
        error,
        success,
    })
}

/// Display order history, optionally filtered by status.
#[instrument(skip(state, session, user))]
pub async fn orders(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Query(query): Query<OrdersQuery>,
) -> impl IntoResponse {
    let filter = query
        .status
        .as_deref()
        .and_then(|status| status.parse::<OrderStatus>().ok());

    let result = state.backend().my_orders(&user.token).await;
    let (orders, error): (Vec<OrderView>, _) = match result {
        Ok(orders) => (
            orders
                .iter()
                .filter(|order| filter.is_none_or(|status| order.status == status))
                .map(OrderView::from)
                .collect(),
            None,
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Could not load order history");
            (Vec::new(), Some(e.user_message()))
        }
    };

    OrdersTemplate {
        nav: NavView::for_session(&session).await,
        tabs: status_tabs(filter),
        orders,
        error,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use ironic_gym_core::OrderId;

    fn order(status: OrderStatus) -> Order {
        Order {
            id: OrderId::new("o1"),
            order_items: Vec::new(),
            shipping_address: AddressForm::default(),
            total_price_cents: ironic_gym_core::Cents::new(999),
            status,
            delivered_at: None,
            created_at: None,
            user: None,
        }
    }

    #[test]
    fn test_delivery_text() {
        assert_eq!(
            delivery_text(&order(OrderStatus::Accepted)),
            "Est. delivery: 7-10 business days"
        );
        assert_eq!(delivery_text(&order(OrderStatus::Completed)), "Delivered");

        let mut delivered = order(OrderStatus::Dispatched);
        delivered.delivered_at = Some(Utc.with_ymd_and_hms(2026, 3, 4, 12, 0, 0).unwrap());
        assert_eq!(delivery_text(&delivered), "Delivered on March 4, 2026");
    }

    #[test]
    fn test_progress_follows_timeline() {
        let widths: Vec<_> = OrderStatus::ALL.into_iter().map(progress_percent).collect();
        assert_eq!(widths, ["0", "33.3", "66.6", "100"]);
    }

    #[test]
    fn test_status_tabs_mark_active() {
        let tabs = status_tabs(Some(OrderStatus::Dispatched));
        assert_eq!(tabs.len(), 5);
        assert!(!tabs[0].active);
        assert!(tabs[3].active);
        assert_eq!(tabs[3].href, "/account/orders?status=Dispatched");
    }
}
