//! Request and response bodies for the store backend.
//!
//! Domain types (products, orders, profiles) live in `ironic_gym_core`; this
//! module only holds the envelopes specific to individual endpoints.

use chrono::NaiveDate;
use ironic_gym_core::{
    AddressForm, CartLine, Cents, HandoffRecord, OrderLine, OrderStatus, UserProfile,
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

// =============================================================================
// Checkout
// =============================================================================

/// Body of `POST /api/create-checkout-session`.
#[derive(Debug, Serialize)]
pub(super) struct CheckoutSessionRequest<'a> {
    pub products: Vec<CheckoutItem<'a>>,
}

/// One cart line as the payment processor integration expects it.
#[derive(Debug, Serialize)]
pub(super) struct CheckoutItem<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub price: Cents,
    pub image: &'a str,
    pub brand: &'a str,
    pub quantity: u32,
}

impl<'a> From<&'a CartLine> for CheckoutItem<'a> {
    fn from(line: &'a CartLine) -> Self {
        Self {
            id: line.id.as_str(),
            name: &line.name,
            price: line.price_cents,
            image: &line.image_url,
            brand: &line.brand,
            quantity: line.quantity,
        }
    }
}

/// A hosted payment session.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    /// Where to send the shopper to pay.
    pub url: String,
}

// =============================================================================
// Orders
// =============================================================================

/// Body of `POST /api/orders`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CreateOrderRequest<'a> {
    pub order_items: &'a [OrderLine],
    pub shipping_address: &'a AddressForm,
    pub total_price: Cents,
}

impl<'a> From<&'a HandoffRecord> for CreateOrderRequest<'a> {
    fn from(record: &'a HandoffRecord) -> Self {
        Self {
            order_items: &record.cart,
            shipping_address: &record.shipping_address,
            total_price: record.total_price_cents,
        }
    }
}

/// Body of `PUT /api/orders/{id}/status`.
///
/// Either field may be sent alone; the admin console changes status and
/// delivery date with separate controls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<NaiveDate>,
}

impl StatusUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.status.is_none() && self.delivered_at.is_none()
    }
}

// =============================================================================
// Auth
// =============================================================================

/// Body of `POST /api/auth/send-otp` and `POST /api/auth/verify-otp`.
///
/// No `Debug`: it carries the password.
#[derive(Clone, Default, Serialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Full international number, country code included.
    pub phone: String,
    /// Only set when verifying.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct SignInRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct EmailRequest<'a> {
    pub email: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ResetPasswordRequest<'a> {
    pub email: &'a str,
    pub otp: &'a str,
    pub new_password: &'a str,
}

/// Body of `POST /api/auth/google-signin`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleSignIn {
    pub name: String,
    pub email: String,
    pub google_id: String,
}

/// Raw sign-in response; the token is wrapped before it leaves this module.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AuthResponse {
    pub user: UserProfile,
    pub token: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// A successful sign-in.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: UserProfile,
    pub token: SecretString,
    pub is_admin: bool,
}

impl From<AuthResponse> for AuthSession {
    fn from(response: AuthResponse) -> Self {
        let is_admin = response.is_admin || response.user.is_admin;
        Self {
            user: response.user,
            token: SecretString::from(response.token),
            is_admin,
        }
    }
}

/// Backend error body: `{ "message": ... }` or `{ "error": ... }`.
#[derive(Debug, Default, Deserialize)]
pub(super) struct ErrorBody {
    pub message: Option<String>,
    pub error: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.message
            .or(self.error)
            .filter(|m| !m.trim().is_empty())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_status_update_omits_unset_fields() {
        let update = StatusUpdate {
            status: Some(OrderStatus::Dispatched),
            delivered_at: None,
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            serde_json::json!({"status": "Dispatched"})
        );

        let update = StatusUpdate {
            status: None,
            delivered_at: NaiveDate::from_ymd_opt(2026, 3, 14),
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            serde_json::json!({"deliveredAt": "2026-03-14"})
        );
        assert!(StatusUpdate::default().is_empty());
    }

    #[test]
    fn test_auth_response_admin_flag_from_either_place() {
        let response: AuthResponse = serde_json::from_value(serde_json::json!({
            "user": {"_id": "u1", "name": "Sam", "email": "sam@example.com", "isAdmin": true},
            "token": "jwt"
        }))
        .unwrap();
        let session = AuthSession::from(response);
        assert!(session.is_admin);
        assert_eq!(session.token.expose_secret(), "jwt");
    }

    #[test]
    fn test_error_body_prefers_message() {
        let body: ErrorBody =
            serde_json::from_value(serde_json::json!({"message": "Nope", "error": "x"})).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("Nope"));

        let body: ErrorBody =
            serde_json::from_value(serde_json::json!({"error": "Stripe down"})).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("Stripe down"));

        assert_eq!(ErrorBody::default().into_message(), None);
    }
}
