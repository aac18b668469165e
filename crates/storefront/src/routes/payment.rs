//! Payment return pages.
//!
//! The processor sends the shopper back to `/payment/success` or
//! `/payment/cancel`. Each request to the success page is one mount of the
//! page and gets its own [`FinalizationGuard`].

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tower_sessions::Session;
use tracing::instrument;

use super::NavView;
use crate::cart::CartStore;
use crate::checkout;
use crate::finalize::{AuthState, FinalizationGuard, FinalizeError, GuardOutcome};
use crate::state::AppState;

/// Seconds before the success page reloads while auth is still unknown.
const WAITING_REFRESH_SECS: u32 = 2;

/// What the success page shows.
#[derive(Clone, Default)]
pub struct SuccessView {
    /// Reload shortly; nothing has happened yet.
    pub waiting: bool,
    /// Show a sign-in link next to the error.
    pub sign_in: bool,
    pub order_id: Option<String>,
    pub error: Option<String>,
}

impl From<GuardOutcome> for SuccessView {
    fn from(outcome: GuardOutcome) -> Self {
        match outcome {
            GuardOutcome::Waiting => Self {
                waiting: true,
                ..Self::default()
            },
            GuardOutcome::Blocked(e) => Self {
                sign_in: matches!(e, FinalizeError::SignInRequired),
                error: Some(e.to_string()),
                ..Self::default()
            },
            GuardOutcome::AlreadyRan => Self::default(),
            GuardOutcome::Created(id) => Self {
                order_id: Some(id.into_inner()),
                ..Self::default()
            },
            GuardOutcome::Failed(e) => Self {
                error: Some(e.to_string()),
                ..Self::default()
            },
        }
    }
}

/// Payment success page template.
#[derive(Template, WebTemplate)]
#[template(path = "payment/success.html")]
pub struct PaymentSuccessTemplate {
    pub nav: NavView,
    pub view: SuccessView,
    pub refresh_secs: u32,
}

/// Payment cancelled page template.
#[derive(Template, WebTemplate)]
#[template(path = "payment/cancel.html")]
pub struct PaymentCancelTemplate {
    pub nav: NavView,
    pub restored: bool,
}

/// Turn the pending handoff record into an order.
#[instrument(skip(state, session))]
pub async fn success(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    let auth = AuthState::resolve(&session).await;
    let guard = FinalizationGuard::new();
    let outcome = guard.run(&auth, &session, state.backend()).await;

    PaymentSuccessTemplate {
        nav: NavView::for_session(&session).await,
        view: SuccessView::from(outcome),
        refresh_secs: WAITING_REFRESH_SECS,
    }
}

/// Put the handed-off lines back into the cart.
#[instrument(skip(session))]
pub async fn cancel(session: Session) -> impl IntoResponse {
    let mut store = CartStore::load(session.clone()).await;
    let restored = checkout::restore_after_cancel(&mut store)
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Could not restore cart after cancelled payment");
            false
        });

    PaymentCancelTemplate {
        nav: NavView::for_session(&session).await,
        restored,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ironic_gym_core::OrderId;

    #[test]
    fn test_success_view_for_each_outcome() {
        let created = SuccessView::from(GuardOutcome::Created(OrderId::new("o1")));
        assert_eq!(created.order_id.as_deref(), Some("o1"));
        assert!(created.error.is_none());

        let blocked = SuccessView::from(GuardOutcome::Blocked(FinalizeError::SignInRequired));
        assert!(blocked.sign_in);
        assert_eq!(
            blocked.error.as_deref(),
            Some("You must be logged in to finalize an order.")
        );

        assert!(SuccessView::from(GuardOutcome::Waiting).waiting);

        let failed = SuccessView::from(GuardOutcome::Failed(FinalizeError::MissingRecord));
        assert!(!failed.sign_in);
        assert!(failed.error.is_some());
    }
}
