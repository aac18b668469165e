//! Checkout route handlers.
//!
//! `POST /checkout` checks the preconditions and shows the billing form;
//! `POST /checkout/confirm` opens the payment session and redirects the
//! shopper to the processor. Failures land back on the cart page with the
//! reason, except address problems, which keep the form open.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use ironic_gym_core::AddressForm;
use tower_sessions::Session;
use tracing::instrument;

use super::NavView;
use super::cart::CartShowTemplate;
use crate::cart::CartStore;
use crate::checkout::{self, CheckoutError};
use crate::error::{Result, add_breadcrumb};
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::state::AppState;

/// Billing form values as rendered into inputs.
#[derive(Clone, Default)]
pub struct BillingFormView {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address_line1: String,
    pub address_line2: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

impl From<&AddressForm> for BillingFormView {
    fn from(form: &AddressForm) -> Self {
        Self {
            name: form.name.clone(),
            email: form.email.clone(),
            phone: form.phone.clone(),
            address_line1: form.address_line1.clone(),
            address_line2: form.address_line2.clone().unwrap_or_default(),
            city: form.city.clone(),
            postal_code: form.postal_code.clone(),
            country: form.country.clone(),
        }
    }
}

/// Billing page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/billing.html")]
pub struct BillingTemplate {
    pub nav: NavView,
    pub form: BillingFormView,
    pub subtotal: String,
    pub item_count: u64,
    pub error: Option<String>,
}

/// Billing inputs fragment (for HTMX "Use My Profile Address").
#[derive(Template, WebTemplate)]
#[template(path = "partials/billing_fields.html")]
pub struct BillingFieldsTemplate {
    pub form: BillingFormView,
}

async fn billing_page(
    session: &Session,
    form: BillingFormView,
    error: Option<String>,
) -> Response {
    let store = CartStore::load(session.clone()).await;
    BillingTemplate {
        nav: NavView::for_session(session).await,
        form,
        subtotal: store.subtotal().to_string(),
        item_count: store.total_items(),
        error,
    }
    .into_response()
}

async fn cart_with_error(session: &Session, error: &CheckoutError) -> Response {
    CartShowTemplate::for_session(session, Some(error.to_string()))
        .await
        .into_response()
}

/// Start checkout.
///
/// The billing form starts empty; the shopper can pull in their profile
/// address with one click.
#[instrument(skip(state, session, user))]
pub async fn begin(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Response {
    let store = CartStore::load(session.clone()).await;
    let token = user.as_ref().map(|u| &u.token);

    match checkout::begin(&store, state.backend(), token).await {
        Ok(_) => billing_page(&session, BillingFormView::default(), None).await,
        Err(e) => {
            tracing::debug!(reason = %e, "Checkout preconditions not met");
            cart_with_error(&session, &e).await
        }
    }
}

/// Billing inputs prefilled from the signed-in profile (HTMX).
#[instrument(skip(state, user))]
pub async fn profile_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse> {
    let profile = state.backend().get_profile(&user.token).await?;
    Ok(BillingFieldsTemplate {
        form: BillingFormView::from(&profile.to_address_form()),
    })
}

/// Submit the billing form and hand off to the payment processor.
#[instrument(skip(state, session, user, form))]
pub async fn confirm(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Form(form): Form<AddressForm>,
) -> Response {
    let Some(user) = user else {
        return cart_with_error(&session, &CheckoutError::NotSignedIn).await;
    };

    let mut store = CartStore::load(session.clone()).await;
    let submitted = BillingFormView::from(&form);

    match checkout::confirm(&mut store, state.backend(), &user.token, form).await {
        Ok(url) => {
            add_breadcrumb("checkout", "Redirected to payment", &[]);
            Redirect::to(&url).into_response()
        }
        Err(e) if e.is_form_error() => {
            billing_page(&session, submitted, Some(e.to_string())).await
        }
        Err(e) => {
            tracing::warn!(error = %e, "Checkout handoff failed");
            cart_with_error(&session, &e).await
        }
    }
}
